//! Embedding service with the zero-vector fallback policy

use futures::stream::{self, StreamExt};
use tracing::warn;

use super::client::EmbeddingClient;
use crate::errors::Result;

/// How many embedding requests run in flight during batch ingestion
const BATCH_CONCURRENCY: usize = 8;

/// Service wrapper around the embedding client.
///
/// Callers always get a vector of the configured dimension back: any
/// provider failure is logged and replaced by a zero vector, so a single
/// bad item can never take down ingestion or a chat turn. A zero vector
/// matches nothing above the similarity threshold, which downstream
/// treats as "no grounding found".
pub struct EmbeddingService {
    client: EmbeddingClient,
    dimension: usize,
}

impl EmbeddingService {
    /// Create the service from application configuration
    pub fn from_config(config: &crate::config::AppConfig) -> Result<Self> {
        let client = EmbeddingClient::new(
            config.embedding_model().to_string(),
            config.embeddings_url().to_string(),
            config.embeddings.timeout_secs,
        )?;

        Ok(Self {
            client,
            dimension: config.embedding_dimension(),
        })
    }

    /// The dimension every returned vector has
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn zero_vector(&self) -> Vec<f32> {
        vec![0.0; self.dimension]
    }

    /// Embed one text; never fails.
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        if text.trim().is_empty() {
            warn!("Empty text passed to embed, returning zero vector");
            return self.zero_vector();
        }

        match self.client.generate(text).await {
            Ok(embedding) if embedding.len() == self.dimension => embedding,
            Ok(embedding) => {
                warn!(
                    "Embedding provider returned {} dimensions, expected {}; using zero vector",
                    embedding.len(),
                    self.dimension
                );
                self.zero_vector()
            }
            Err(e) => {
                warn!("Embedding failed, using zero vector: {}", e);
                self.zero_vector()
            }
        }
    }

    /// Embed a batch; output order matches input order and one failed item
    /// never poisons the rest.
    pub async fn embed_many(&self, texts: &[String]) -> Vec<Vec<f32>> {
        let concurrency = std::cmp::min(texts.len().max(1), BATCH_CONCURRENCY);

        let futures: Vec<_> = texts.iter().map(|text| self.embed(text)).collect();
        stream::iter(futures)
            .buffered(concurrency)
            .collect()
            .await
    }

    /// Readiness probe: true when the provider answers and serves the
    /// configured model (`model` or `model:tag`).
    pub async fn is_ready(&self) -> bool {
        match self.client.list_models().await {
            Ok(models) => {
                let wanted = self.client.model();
                let found = models
                    .iter()
                    .any(|m| m == wanted || m.starts_with(&format!("{wanted}:")));
                if !found {
                    warn!("Embedding model {} not present on the provider", wanted);
                }
                found
            }
            Err(e) => {
                warn!("Embedding provider not reachable: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn unreachable_service() -> EmbeddingService {
        let mut config = AppConfig::default();
        // Nothing listens here; connections are refused immediately
        config.embeddings.url = "http://127.0.0.1:9".to_string();
        config.embeddings.dimension = 768;
        EmbeddingService::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_embed_falls_back_to_zero_vector_when_provider_down() {
        let service = unreachable_service();
        let embedding = service.embed("Apa itu KSJPS?").await;
        assert_eq!(embedding.len(), 768);
        assert!(embedding.iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn test_empty_text_short_circuits_to_zero_vector() {
        let service = unreachable_service();
        let embedding = service.embed("   ").await;
        assert_eq!(embedding.len(), 768);
        assert!(embedding.iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn test_embed_many_keeps_input_order_and_length() {
        let service = unreachable_service();
        let texts = vec![
            "satu".to_string(),
            "dua".to_string(),
            "tiga".to_string(),
        ];
        let embeddings = service.embed_many(&texts).await;
        assert_eq!(embeddings.len(), 3);
        for embedding in embeddings {
            assert_eq!(embedding.len(), 768);
        }
    }

    #[tokio::test]
    async fn test_is_ready_false_when_provider_down() {
        let service = unreachable_service();
        assert!(!service.is_ready().await);
    }
}
