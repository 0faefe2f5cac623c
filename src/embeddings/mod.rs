//! Embeddings generation module
//!
//! Text is embedded through a local Ollama-style provider. The service
//! layer enforces the fallback policy: a failed embedding becomes a zero
//! vector of the configured dimension instead of an error, so retrieval
//! degrades to "no grounding" rather than failing a chat turn.
//!
//! # Examples
//!
//! ```rust,no_run
//! use chatrag::config::AppConfig;
//! use chatrag::embeddings::EmbeddingService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let service = EmbeddingService::from_config(&config)?;
//!
//!     let embedding = service.embed("Apa itu KSJPS?").await;
//!     println!("Generated embedding with {} dimensions", embedding.len());
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod service;

pub use client::EmbeddingClient;
pub use service::EmbeddingService;

/// Default embedding dimension for nomic-embed-text
pub const DEFAULT_EMBEDDING_DIM: usize = 768;
