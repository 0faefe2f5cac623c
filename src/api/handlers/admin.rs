/// Admin API handlers for retention and reset
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Duration;
use chrono::Utc;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::AppState;
use crate::api::types::PurgeRequest;
use crate::api::types::PurgeResponse;
use crate::api::types::ResetResponse;

/// Retention purge (POST /api/admin/purge). Deletes turns older than
/// the requested cutoff, defaulting to the configured retention window.
pub async fn admin_purge(
    State(state): State<AppState>,
    Json(req): Json<PurgeRequest>,
) -> Result<Json<PurgeResponse>, StatusCode> {
    let days = req.days.unwrap_or(state.retention_days);
    info!("POST /api/admin/purge - cutoff {} days", days);

    if days < 0 {
        return Err(StatusCode::BAD_REQUEST);
    }
    let cutoff = Utc::now() - Duration::days(days);

    match state.database.purge_older_than(cutoff).await {
        Ok(deleted) => Ok(Json(PurgeResponse {
            status: "success".to_string(),
            deleted,
            cutoff_days: days,
            cutoff,
        })),
        Err(e) => {
            error!("Error purging conversations: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Full conversation reset (POST /api/admin/reset). Drops every stored
/// turn; user identities survive.
pub async fn admin_reset(
    State(state): State<AppState>,
) -> Result<Json<ResetResponse>, StatusCode> {
    warn!("POST /api/admin/reset - clearing all conversations");

    match state.database.reset_all_conversations().await {
        Ok((before, after)) => Ok(Json(ResetResponse {
            status: "success".to_string(),
            turns_before: before,
            turns_after: after,
        })),
        Err(e) => {
            error!("Error resetting conversations: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
