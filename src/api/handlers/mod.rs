/// API request handlers
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;

use crate::api::types::HealthResponse;
use crate::api::types::ServiceBanner;
use crate::api::types::ServiceProbes;
use crate::chat::ChatService;
use crate::database::Database;
use crate::dedup::DedupCoordinator;
use crate::embeddings::EmbeddingService;
use crate::llm::LlmService;
use crate::rag::KnowledgeRetriever;
use crate::vector_store::VectorStoreClient;

// Re-export sub-modules
pub mod admin;
pub mod chat;
pub mod context;
pub mod knowledge;

// Re-export handlers
pub use admin::*;
pub use chat::*;
pub use context::*;
pub use knowledge::*;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub database: Arc<Database>,
    pub embeddings: Arc<EmbeddingService>,
    pub vector_store: Arc<VectorStoreClient>,
    pub retriever: Arc<KnowledgeRetriever>,
    pub chat: Arc<ChatService>,
    pub dedup: Arc<DedupCoordinator>,
    pub llm: Arc<LlmService>,
    pub retention_days: i64,
    pub context_read_limit: usize,
}

/// Service banner handler
pub async fn root() -> Json<ServiceBanner> {
    Json(ServiceBanner {
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
        timestamp: Utc::now(),
    })
}

/// Aggregate health check. Always answers 200; per-service probes carry
/// the failure reason and the overall status flips to degraded.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (database, vector_store, embeddings) = tokio::join!(
        probe_database(&state.database),
        probe_vector_store(&state.vector_store),
        probe_embeddings(&state.embeddings),
    );
    let llm = if state.llm.is_configured() {
        "configured".to_string()
    } else {
        "not_configured".to_string()
    };

    let all_healthy = [&database, &vector_store, &embeddings]
        .iter()
        .all(|probe| probe.as_str() == "healthy")
        && llm == "configured";

    Json(HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        services: ServiceProbes {
            database,
            vector_store,
            embeddings,
            llm,
        },
        timestamp: Utc::now(),
    })
}

async fn probe_database(database: &Database) -> String {
    match sqlx::query("SELECT 1").execute(database.pool()).await {
        Ok(_) => "healthy".to_string(),
        Err(e) => format!("unhealthy: {e}"),
    }
}

async fn probe_vector_store(vector_store: &VectorStoreClient) -> String {
    match vector_store.collection_info().await {
        Ok(_) => "healthy".to_string(),
        Err(e) => format!("unhealthy: {e}"),
    }
}

async fn probe_embeddings(embeddings: &EmbeddingService) -> String {
    if embeddings.is_ready().await {
        "healthy".to_string()
    } else {
        "unhealthy: embedding model not available".to_string()
    }
}
