//! Vector knowledge store module
//!
//! The knowledge base lives in a Qdrant collection, driven over its REST
//! API. Document identity is a deterministic content hash, so re-ingesting
//! the same text overwrites the same point instead of duplicating it.

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

pub mod client;

pub use client::VectorStoreClient;

/// A knowledge passage scored against a query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub id: String,
    pub score: f32,
    pub text: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Collection statistics as reported by the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionStats {
    pub name: String,
    pub vectors_count: u64,
    pub points_count: u64,
    pub status: String,
}

/// One document to ingest into the knowledge base
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInput {
    pub text: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    /// Explicit point id; derived from the content hash when absent
    #[serde(default)]
    pub id: Option<String>,
}

/// Deterministic point id for a document text.
///
/// First 16 bytes of the sha256 digest, hex encoded: 32 hex characters,
/// which Qdrant accepts as a simple-format UUID.
pub fn content_hash_id(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(&digest[..16])
}
