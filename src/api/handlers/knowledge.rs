/// Knowledge-base API handlers
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tracing::error;
use tracing::info;

use super::AppState;
use crate::api::types::KnowledgeAddRequest;
use crate::api::types::KnowledgeAddResponse;
use crate::api::types::KnowledgeDeleteResponse;
use crate::api::types::KnowledgeSearchQuery;
use crate::api::types::KnowledgeSearchResponse;
use crate::api::types::KnowledgeStatsResponse;

/// Add documents to the knowledge base (POST /api/knowledge/add)
pub async fn knowledge_add(
    State(state): State<AppState>,
    Json(req): Json<KnowledgeAddRequest>,
) -> Result<Json<KnowledgeAddResponse>, StatusCode> {
    info!(
        "POST /api/knowledge/add - {} documents",
        req.documents.len()
    );

    match state.vector_store.upsert_documents(&req.documents).await {
        Ok(count) => Ok(Json(KnowledgeAddResponse {
            status: "success".to_string(),
            documents_added: count,
            timestamp: Utc::now(),
        })),
        Err(e) => {
            error!("Error adding documents: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Diagnostic knowledge search (GET /api/knowledge/search). Tolerant:
/// a faulted retrieval comes back as an empty result set, not a 5xx.
pub async fn knowledge_search(
    State(state): State<AppState>,
    Query(params): Query<KnowledgeSearchQuery>,
) -> Json<KnowledgeSearchResponse> {
    info!("GET /api/knowledge/search?query={}", params.query);

    let results = state
        .retriever
        .search_knowledge(&params.query, params.limit, params.threshold)
        .await;

    Json(KnowledgeSearchResponse {
        query: params.query,
        count: results.len(),
        results,
    })
}

/// Remove one document by id (DELETE /api/knowledge/:id)
pub async fn knowledge_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<KnowledgeDeleteResponse>, StatusCode> {
    info!("DELETE /api/knowledge/{}", id);

    match state.vector_store.delete_document(&id).await {
        Ok(()) => Ok(Json(KnowledgeDeleteResponse {
            status: "success".to_string(),
            id,
        })),
        Err(e) => {
            error!("Error deleting document {}: {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Knowledge collection statistics (GET /api/knowledge/stats). A
/// vector-store outage is reported in the payload, not as a failure.
pub async fn knowledge_stats(State(state): State<AppState>) -> Json<KnowledgeStatsResponse> {
    info!("GET /api/knowledge/stats");

    match state.vector_store.collection_info().await {
        Ok(collection) => Json(KnowledgeStatsResponse {
            status: "success".to_string(),
            collection: Some(collection),
            error: None,
        }),
        Err(e) => {
            error!("Error reading collection info: {}", e);
            Json(KnowledgeStatsResponse {
                status: "error".to_string(),
                collection: None,
                error: Some(e.to_string()),
            })
        }
    }
}
