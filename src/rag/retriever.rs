//! Knowledge retrieval over the vector store

use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use super::format_context;
use super::RetrievalFault;
use crate::embeddings::EmbeddingService;
use crate::vector_store::ScoredPassage;
use crate::vector_store::VectorStoreClient;

/// Retriever querying the knowledge base
pub struct KnowledgeRetriever {
    store: Arc<VectorStoreClient>,
    embeddings: Arc<EmbeddingService>,
    max_results: usize,
    score_threshold: f32,
}

impl KnowledgeRetriever {
    /// Create a new retriever with the configured defaults
    pub fn new(
        store: Arc<VectorStoreClient>,
        embeddings: Arc<EmbeddingService>,
        config: &crate::config::AppConfig,
    ) -> Self {
        Self {
            store,
            embeddings,
            max_results: config.max_results(),
            score_threshold: config.score_threshold(),
        }
    }

    /// Configured passage cap per query
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Configured minimum similarity score
    pub fn score_threshold(&self) -> f32 {
        self.score_threshold
    }

    /// Retrieve ranked passages for a query using the configured bounds.
    ///
    /// `Ok(vec![])` means the knowledge base had nothing relevant; `Err`
    /// means retrieval itself failed. Callers decide which of the two they
    /// tolerate.
    pub async fn retrieve(
        &self,
        query: &str,
    ) -> std::result::Result<Vec<ScoredPassage>, RetrievalFault> {
        self.retrieve_with(query, self.max_results, self.score_threshold)
            .await
    }

    /// Retrieve with explicit bounds
    pub async fn retrieve_with(
        &self,
        query: &str,
        limit: usize,
        score_threshold: f32,
    ) -> std::result::Result<Vec<ScoredPassage>, RetrievalFault> {
        debug!("Retrieving passages for query: {}", query);

        // A failed embedding comes back as a zero vector, which matches
        // nothing above the threshold and lands in the refusal path.
        let vector = self.embeddings.embed(query).await;

        match self.store.search(&vector, limit, score_threshold).await {
            Ok(passages) => {
                debug!("Retrieved {} passages", passages.len());
                Ok(passages)
            }
            Err(e) => {
                let fault = RetrievalFault::from(e);
                warn!("Retrieval failed: {}", fault);
                Err(fault)
            }
        }
    }

    /// Tolerant search for diagnostic surfaces: faults become an empty
    /// result instead of propagating.
    pub async fn search_knowledge(
        &self,
        query: &str,
        limit: Option<usize>,
        score_threshold: Option<f32>,
    ) -> Vec<ScoredPassage> {
        let limit = limit.unwrap_or(self.max_results);
        let threshold = score_threshold.unwrap_or(self.score_threshold);

        self.retrieve_with(query, limit, threshold)
            .await
            .unwrap_or_default()
    }

    /// Retrieve and format in one step; empty string when nothing
    /// qualifies or retrieval faulted.
    pub async fn build_context(&self, query: &str, max_results: usize) -> String {
        let passages = self
            .retrieve_with(query, max_results, self.score_threshold)
            .await
            .unwrap_or_default();
        format_context(&passages)
    }
}
