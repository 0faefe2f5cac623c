//! OpenAI-compatible chat completions client

use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::ChatMessage;
use crate::errors::ChatRagError;
use crate::errors::Result;

/// Completion client for an OpenAI-compatible provider
pub struct LlmService {
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: Client,
}

impl LlmService {
    /// Create the service from application configuration
    pub fn from_config(config: &crate::config::AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.llm.timeout_secs))
            .build()
            .map_err(|e| ChatRagError::HttpError(e.to_string()))?;

        Ok(Self {
            api_url: config.llm_api_url().trim_end_matches('/').to_string(),
            api_key: config.llm_api_key().to_string(),
            model: config.llm_model().to_string(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            client,
        })
    }

    /// Model this service completes with
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether a provider API key is present
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Run one chat completion and return the assistant text
    ///
    /// # Errors
    /// - Missing API key
    /// - Provider/network failures and timeouts
    /// - Non-success statuses (bad key, rate limit, model not found)
    /// - Responses without a completion choice
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(ChatRagError::ConfigError(
                "LLM API key not provided".to_string(),
            ));
        }

        #[derive(Serialize)]
        struct CompletionRequest<'a> {
            model: &'a str,
            messages: &'a [ChatMessage],
            temperature: f32,
            max_tokens: u32,
        }

        #[derive(Deserialize)]
        struct CompletionResponse {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMessage,
        }

        #[derive(Deserialize)]
        struct ChoiceMessage {
            content: String,
        }

        let url = format!("{}/chat/completions", self.api_url);
        debug!("Calling chat completions: {} ({} messages)", url, messages.len());

        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChatRagError::Timeout(e.to_string())
                } else {
                    ChatRagError::LlmError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ChatRagError::LlmError(format!(
                "Completion API error ({status}): {error_text}"
            )));
        }

        let result: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatRagError::LlmError(format!("Failed to parse response: {e}")))?;

        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ChatRagError::LlmError("No completion choices in response".to_string()))
    }
}
