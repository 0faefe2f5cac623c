use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatRagError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("User not found: {0} on {1}")]
    UserNotFound(String, String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Vector store error: {0}")]
    VectorStoreError(String),

    #[error("Vector dimension mismatch: expected {0}, got {1}")]
    DimensionMismatch(usize, usize),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Custom(String),
}

pub type Result<T> = std::result::Result<T, ChatRagError>;
