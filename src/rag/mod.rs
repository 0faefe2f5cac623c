//! Retrieval policy module
//!
//! Turns a user query into ranked knowledge passages and a formatted
//! context block. Retrieval failures are explicit: the retriever returns a
//! `RetrievalFault` instead of silently swallowing errors, and only the
//! tolerant wrappers (diagnostic search, context building) convert a fault
//! into an empty result.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use chatrag::config::AppConfig;
//! use chatrag::embeddings::EmbeddingService;
//! use chatrag::rag::KnowledgeRetriever;
//! use chatrag::vector_store::VectorStoreClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let embeddings = Arc::new(EmbeddingService::from_config(&config)?);
//!     let store = Arc::new(VectorStoreClient::from_config(&config, embeddings.clone())?);
//!     let retriever = KnowledgeRetriever::new(store, embeddings, &config);
//!
//!     let passages = retriever.search_knowledge("Apa itu KSJPS?", None, None).await;
//!     println!("Found {} passages", passages.len());
//!
//!     Ok(())
//! }
//! ```

use thiserror::Error;

pub mod context;
pub mod retriever;

pub use context::format_context;
pub use context::CONTEXT_HEADER;
pub use retriever::KnowledgeRetriever;

use crate::errors::ChatRagError;

/// Why a retrieval attempt failed.
///
/// Distinct from "retrieval found nothing": the answering policy treats an
/// empty result as a refusal and a fault as a degraded-service apology.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalFault {
    #[error("knowledge store timed out")]
    ProviderTimeout,
    #[error("query vector dimension mismatch")]
    DimensionMismatch,
    #[error("knowledge store unavailable")]
    StoreUnavailable,
}

impl From<ChatRagError> for RetrievalFault {
    fn from(e: ChatRagError) -> Self {
        match e {
            ChatRagError::Timeout(_) => Self::ProviderTimeout,
            ChatRagError::DimensionMismatch(..) => Self::DimensionMismatch,
            _ => Self::StoreUnavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_mapping() {
        assert_eq!(
            RetrievalFault::from(ChatRagError::Timeout("deadline".into())),
            RetrievalFault::ProviderTimeout
        );
        assert_eq!(
            RetrievalFault::from(ChatRagError::DimensionMismatch(768, 3)),
            RetrievalFault::DimensionMismatch
        );
        assert_eq!(
            RetrievalFault::from(ChatRagError::VectorStoreError("down".into())),
            RetrievalFault::StoreUnavailable
        );
        assert_eq!(
            RetrievalFault::from(ChatRagError::HttpError("connection refused".into())),
            RetrievalFault::StoreUnavailable
        );
    }
}
