//! HTTP client for the local Ollama embedding provider

use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::errors::ChatRagError;
use crate::errors::Result;

/// Client for generating embeddings via Ollama
pub struct EmbeddingClient {
    model: String,
    endpoint: String,
    client: Client,
}

impl EmbeddingClient {
    /// Create a new embedding client
    ///
    /// # Errors
    /// - HTTP client build errors (invalid configuration)
    pub fn new(model: String, endpoint: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ChatRagError::HttpError(e.to_string()))?;

        Ok(Self {
            model,
            endpoint,
            client,
        })
    }

    /// Generate an embedding for a single text
    ///
    /// # Errors
    /// - API request failures (network errors, timeouts)
    /// - Invalid API responses (non-success status, malformed JSON)
    pub async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct OllamaRequest<'a> {
            model: &'a str,
            prompt: &'a str,
        }

        #[derive(Deserialize)]
        struct OllamaResponse {
            embedding: Vec<f32>,
        }

        let url = format!("{}/api/embeddings", self.endpoint);
        debug!("Calling Ollama embeddings API: {}", url);

        let request = OllamaRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatRagError::HttpError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ChatRagError::EmbeddingError(format!(
                "Ollama API error ({status}): {error_text}"
            )));
        }

        let result: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ChatRagError::EmbeddingError(format!("Failed to parse response: {e}")))?;

        Ok(result.embedding)
    }

    /// List the model names the provider currently serves
    ///
    /// # Errors
    /// - API request failures (network errors, timeouts)
    /// - Invalid API responses (non-success status, malformed JSON)
    pub async fn list_models(&self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct TagsResponse {
            models: Vec<ModelTag>,
        }

        #[derive(Deserialize)]
        struct ModelTag {
            name: String,
        }

        let url = format!("{}/api/tags", self.endpoint);
        debug!("Checking Ollama model list: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ChatRagError::HttpError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChatRagError::EmbeddingError(format!(
                "Ollama API error ({})",
                response.status()
            )));
        }

        let result: TagsResponse = response
            .json()
            .await
            .map_err(|e| ChatRagError::EmbeddingError(format!("Failed to parse response: {e}")))?;

        Ok(result.models.into_iter().map(|m| m.name).collect())
    }

    /// Model this client embeds with
    pub fn model(&self) -> &str {
        &self.model
    }
}
