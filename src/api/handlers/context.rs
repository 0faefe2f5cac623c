/// Conversation context API handlers
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::error;
use tracing::info;

use super::AppState;
use crate::api::types::ClearContextResponse;
use crate::api::types::ContextQuery;
use crate::api::types::ContextResponse;
use crate::api::types::UsersResponse;
use crate::models::UserContextStats;

/// Read recent conversation history (GET /api/context/:user_id/:platform)
pub async fn get_context(
    State(state): State<AppState>,
    Path((user_id, platform)): Path<(String, String)>,
    Query(params): Query<ContextQuery>,
) -> Result<Json<ContextResponse>, StatusCode> {
    info!("GET /api/context/{}/{}", user_id, platform);

    let limit = params.limit.unwrap_or(state.context_read_limit);

    match state
        .database
        .bounded_history(&user_id, &platform, limit)
        .await
    {
        Ok(history) => Ok(Json(ContextResponse {
            user_id,
            platform,
            count: history.len(),
            history,
        })),
        Err(e) => {
            error!("Error reading context: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Clear conversation history (DELETE /api/context/:user_id/:platform)
pub async fn clear_context(
    State(state): State<AppState>,
    Path((user_id, platform)): Path<(String, String)>,
) -> Result<Json<ClearContextResponse>, StatusCode> {
    info!("DELETE /api/context/{}/{}", user_id, platform);

    match state.database.clear_history(&user_id, &platform).await {
        Ok(deleted) => Ok(Json(ClearContextResponse {
            status: "success".to_string(),
            user_id,
            platform,
            messages_deleted: deleted,
        })),
        Err(e) => {
            error!("Error clearing context: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Conversation stats for one user (GET /api/context/:user_id/:platform/stats)
pub async fn context_stats(
    State(state): State<AppState>,
    Path((user_id, platform)): Path<(String, String)>,
) -> Result<Json<UserContextStats>, StatusCode> {
    info!("GET /api/context/{}/{}/stats", user_id, platform);

    match state.database.user_stats(&user_id, &platform).await {
        Ok(Some(stats)) => Ok(Json(stats)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Error reading user stats: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// List known users (GET /api/users)
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<UsersResponse>, StatusCode> {
    info!("GET /api/users");

    match state.database.list_users().await {
        Ok(users) => Ok(Json(UsersResponse {
            count: users.len(),
            users,
        })),
        Err(e) => {
            error!("Error listing users: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
