//! Qdrant REST client

use std::sync::Arc;

use reqwest::Client;
use serde_json::json;
use serde_json::Value;
use tracing::debug;
use tracing::info;

use super::content_hash_id;
use super::CollectionStats;
use super::DocumentInput;
use super::ScoredPassage;
use crate::embeddings::EmbeddingService;
use crate::errors::ChatRagError;
use crate::errors::Result;

/// Qdrant gateway for one collection.
///
/// Holds the embedding service so ingestion can turn document text into
/// vectors; searches take an already-computed query vector.
pub struct VectorStoreClient {
    base_url: String,
    collection: String,
    dimension: usize,
    embeddings: Arc<EmbeddingService>,
    client: Client,
}

impl VectorStoreClient {
    /// Create the client from application configuration
    pub fn from_config(
        config: &crate::config::AppConfig,
        embeddings: Arc<EmbeddingService>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.vector_store.timeout_secs))
            .build()
            .map_err(|e| ChatRagError::HttpError(e.to_string()))?;

        Ok(Self {
            base_url: config.vector_store_url().trim_end_matches('/').to_string(),
            collection: config.collection_name().to_string(),
            dimension: config.embedding_dimension(),
            embeddings,
            client,
        })
    }

    /// Vector dimension this collection is configured for
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Collection name this client operates on
    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn map_send_error(e: reqwest::Error) -> ChatRagError {
        if e.is_timeout() {
            ChatRagError::Timeout(e.to_string())
        } else {
            ChatRagError::HttpError(e.to_string())
        }
    }

    /// Qdrant wraps failures in `{"status": {"error": "..."}}`
    fn check_error_envelope(value: &Value) -> Result<()> {
        if let Some(error) = value
            .get("status")
            .and_then(|s| s.get("error"))
            .and_then(|e| e.as_str())
        {
            return Err(ChatRagError::VectorStoreError(error.to_string()));
        }
        Ok(())
    }

    /// Create the collection if it does not exist yet. Idempotent, safe to
    /// call at every startup.
    pub async fn ensure_collection(&self) -> Result<()> {
        let url = format!("{}/collections", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        if !response.status().is_success() {
            return Err(ChatRagError::VectorStoreError(format!(
                "Failed to list collections ({})",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ChatRagError::VectorStoreError(e.to_string()))?;

        let exists = body
            .get("result")
            .and_then(|r| r.get("collections"))
            .and_then(|c| c.as_array())
            .is_some_and(|collections| {
                collections.iter().any(|c| {
                    c.get("name").and_then(|n| n.as_str()) == Some(self.collection.as_str())
                })
            });

        if exists {
            debug!("Collection {} already exists", self.collection);
            return Ok(());
        }

        let create_url = format!("{}/collections/{}", self.base_url, self.collection);
        let body = json!({
            "vectors": {
                "size": self.dimension,
                "distance": "Cosine"
            }
        });

        let response = self
            .client
            .put(&create_url)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ChatRagError::VectorStoreError(format!(
                "Failed to create collection ({status}): {text}"
            )));
        }

        info!(
            "Created collection {} (dimension {}, cosine distance)",
            self.collection, self.dimension
        );
        Ok(())
    }

    /// Embed and upsert a batch of documents. Returns how many points were
    /// written. Documents without an explicit id get their content hash.
    pub async fn upsert_documents(&self, documents: &[DocumentInput]) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = self.embeddings.embed_many(&texts).await;

        let points: Vec<Value> = documents
            .iter()
            .zip(vectors)
            .map(|(doc, vector)| {
                let id = doc
                    .id
                    .clone()
                    .unwrap_or_else(|| content_hash_id(&doc.text));
                json!({
                    "id": id,
                    "vector": vector,
                    "payload": {
                        "text": doc.text,
                        "metadata": doc.metadata.clone().unwrap_or(Value::Null)
                    }
                })
            })
            .collect();

        let count = points.len();
        let url = format!(
            "{}/collections/{}/points?wait=true",
            self.base_url, self.collection
        );

        let response = self
            .client
            .put(&url)
            .json(&json!({ "points": points }))
            .send()
            .await
            .map_err(Self::map_send_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ChatRagError::VectorStoreError(format!(
                "Upsert failed ({status}): {text}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ChatRagError::VectorStoreError(e.to_string()))?;
        Self::check_error_envelope(&body)?;

        info!("Upserted {} documents into {}", count, self.collection);
        Ok(count)
    }

    /// Scored similarity search.
    ///
    /// The query vector length is validated against the collection
    /// dimension before anything goes on the wire.
    pub async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredPassage>> {
        if vector.len() != self.dimension {
            return Err(ChatRagError::DimensionMismatch(self.dimension, vector.len()));
        }

        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection
        );
        let body = json!({
            "vector": vector,
            "limit": limit,
            "score_threshold": score_threshold,
            "with_payload": true
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ChatRagError::VectorStoreError(format!(
                "Search failed ({status}): {text}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ChatRagError::VectorStoreError(e.to_string()))?;
        Self::check_error_envelope(&body)?;

        let mut passages = parse_search_points(&body);
        sort_by_score(&mut passages);
        Ok(passages)
    }

    /// Delete one point by id
    pub async fn delete_document(&self, id: &str) -> Result<()> {
        let url = format!(
            "{}/collections/{}/points/delete?wait=true",
            self.base_url, self.collection
        );

        let response = self
            .client
            .post(&url)
            .json(&json!({ "points": [id] }))
            .send()
            .await
            .map_err(Self::map_send_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ChatRagError::VectorStoreError(format!(
                "Delete failed ({status}): {text}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ChatRagError::VectorStoreError(e.to_string()))?;
        Self::check_error_envelope(&body)?;

        info!("Deleted document {} from {}", id, self.collection);
        Ok(())
    }

    /// Collection statistics. Callers at system boundaries map failures to
    /// an error payload instead of propagating.
    pub async fn collection_info(&self) -> Result<CollectionStats> {
        let url = format!("{}/collections/{}", self.base_url, self.collection);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        if !response.status().is_success() {
            return Err(ChatRagError::VectorStoreError(format!(
                "Failed to read collection info ({})",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ChatRagError::VectorStoreError(e.to_string()))?;
        Self::check_error_envelope(&body)?;

        let result = body.get("result").cloned().unwrap_or_default();
        let points_count = result
            .get("points_count")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        // Newer Qdrant versions report vectors_count as null
        let vectors_count = result
            .get("vectors_count")
            .and_then(Value::as_u64)
            .unwrap_or(points_count);
        let status = result
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        Ok(CollectionStats {
            name: self.collection.clone(),
            vectors_count,
            points_count,
            status,
        })
    }
}

/// Extract scored passages from a Qdrant search response body
fn parse_search_points(body: &Value) -> Vec<ScoredPassage> {
    let points = body
        .get("result")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    points
        .iter()
        .map(|point| {
            let id = point
                .get("id")
                .map(|v| {
                    v.as_str()
                        .map_or_else(|| v.to_string(), ToString::to_string)
                })
                .unwrap_or_default();
            let score = point.get("score").and_then(Value::as_f64).unwrap_or(0.0) as f32;
            let payload = point.get("payload").cloned().unwrap_or_default();
            let text = payload
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            let metadata = payload.get("metadata").cloned().unwrap_or(Value::Null);

            ScoredPassage {
                id,
                score,
                text,
                metadata,
            }
        })
        .collect()
}

/// Qdrant already ranks results, but the ordering contract matters enough
/// downstream to enforce it here.
fn sort_by_score(passages: &mut [ScoredPassage]) {
    passages.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
