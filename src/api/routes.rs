//! API route definitions

use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use axum::Router;

use super::handlers::AppState;
use super::handlers::{
    self,
};

/// Create RESTful API router
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        // Service banner and health
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        // Chat endpoints
        .route("/chat", post(handlers::chat))
        .route("/webhook/message", post(handlers::webhook_message))
        // Knowledge base
        .route("/knowledge/add", post(handlers::knowledge_add))
        .route("/knowledge/search", get(handlers::knowledge_search))
        .route("/knowledge/stats", get(handlers::knowledge_stats))
        .route("/knowledge/:id", delete(handlers::knowledge_delete))
        // Conversation context
        .route(
            "/context/:user_id/:platform",
            get(handlers::get_context).delete(handlers::clear_context),
        )
        .route(
            "/context/:user_id/:platform/stats",
            get(handlers::context_stats),
        )
        .route("/users", get(handlers::list_users))
        // Administration
        .route("/admin/purge", post(handlers::admin_purge))
        .route("/admin/reset", post(handlers::admin_reset))
        .with_state(state)
}
