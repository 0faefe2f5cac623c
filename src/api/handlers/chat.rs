/// Chat and webhook API handlers
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::error;
use tracing::info;

use super::AppState;
use crate::api::types::ChatReply;
use crate::api::types::ChatRequest;
use crate::api::types::WebhookReply;
use crate::api::types::WebhookRequest;
use crate::errors::ChatRagError;

/// Direct chat (POST /api/chat). Not deduplicated; callers of this
/// endpoint are expected to send each message once.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, StatusCode> {
    info!("POST /api/chat from {} on {}", req.user_id, req.platform);

    match state
        .chat
        .handle_message(
            &req.user_id,
            &req.platform,
            &req.message,
            req.use_knowledge_base,
        )
        .await
    {
        Ok(outcome) => Ok(Json(ChatReply {
            response: outcome.response,
            timestamp: outcome.timestamp,
            sources_used: outcome.sources_used,
        })),
        Err(e) => Err(map_chat_error(&e)),
    }
}

/// Inbound webhook message (POST /api/webhook/message). Runs through
/// the dedup coordinator so gateway redeliveries get the cached reply
/// instead of a second pipeline run.
pub async fn webhook_message(
    State(state): State<AppState>,
    Json(req): Json<WebhookRequest>,
) -> Result<Json<WebhookReply>, StatusCode> {
    info!(
        "POST /api/webhook/message from {} on {}",
        req.user_id, req.platform
    );

    let chat = state.chat.clone();
    let user_id = req.user_id.clone();
    let platform = req.platform.clone();
    let message = req.message.clone();

    let result = state
        .dedup
        .run(&req.user_id, &req.platform, &req.message, move || async move {
            let outcome = chat.handle_message(&user_id, &platform, &message, true).await?;
            Ok(WebhookReply {
                status: "success".to_string(),
                user_id,
                platform,
                response: outcome.response,
                sources_used: outcome.sources_used,
                timestamp: outcome.timestamp,
            })
        })
        .await;

    match result {
        Ok(reply) => Ok(Json(reply)),
        Err(e) => Err(map_chat_error(&e)),
    }
}

/// Completion-provider failures are upstream errors; everything else on
/// the chat path is an internal failure.
fn map_chat_error(e: &ChatRagError) -> StatusCode {
    match e {
        ChatRagError::LlmError(_) | ChatRagError::Timeout(_) => {
            error!("Completion provider failure: {}", e);
            StatusCode::BAD_GATEWAY
        }
        other => {
            error!("Chat pipeline failure: {}", other);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
