//! API request and response types

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::models::ChatUser;
use crate::models::ConversationTurn;
use crate::vector_store::CollectionStats;
use crate::vector_store::DocumentInput;
use crate::vector_store::ScoredPassage;

/// Service banner for the API root
#[derive(Debug, Serialize)]
pub struct ServiceBanner {
    pub service: String,
    pub version: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate health report
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub services: ServiceProbes,
    pub timestamp: DateTime<Utc>,
}

/// Per-dependency health probes
#[derive(Debug, Serialize)]
pub struct ServiceProbes {
    pub database: String,
    pub vector_store: String,
    pub embeddings: String,
    pub llm: String,
}

/// Direct chat request
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    #[serde(default = "default_platform")]
    pub platform: String,
    pub message: String,
    #[serde(default = "default_use_knowledge_base")]
    pub use_knowledge_base: bool,
}

fn default_platform() -> String {
    "api".to_string()
}

fn default_use_knowledge_base() -> bool {
    true
}

/// Direct chat reply
#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub timestamp: DateTime<Utc>,
    pub sources_used: usize,
}

/// Inbound webhook message
#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    pub user_id: String,
    pub platform: String,
    pub message: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Webhook reply. Round-trips through the dedup cache, so it carries
/// Deserialize as well.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookReply {
    pub status: String,
    pub user_id: String,
    pub platform: String,
    pub response: String,
    pub sources_used: usize,
    pub timestamp: DateTime<Utc>,
}

/// Knowledge ingestion request
#[derive(Debug, Deserialize)]
pub struct KnowledgeAddRequest {
    pub documents: Vec<DocumentInput>,
}

/// Knowledge ingestion reply
#[derive(Debug, Serialize)]
pub struct KnowledgeAddResponse {
    pub status: String,
    pub documents_added: usize,
    pub timestamp: DateTime<Utc>,
}

/// Knowledge search query parameters
#[derive(Debug, Deserialize)]
pub struct KnowledgeSearchQuery {
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub threshold: Option<f32>,
}

/// Knowledge search reply
#[derive(Debug, Serialize)]
pub struct KnowledgeSearchResponse {
    pub query: String,
    pub results: Vec<ScoredPassage>,
    pub count: usize,
}

/// Knowledge collection statistics. Carries the error text instead of
/// failing the request when the vector store is down.
#[derive(Debug, Serialize)]
pub struct KnowledgeStatsResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<CollectionStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Knowledge document removal reply
#[derive(Debug, Serialize)]
pub struct KnowledgeDeleteResponse {
    pub status: String,
    pub id: String,
}

/// Context read query parameters
#[derive(Debug, Deserialize)]
pub struct ContextQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Conversation history reply
#[derive(Debug, Serialize)]
pub struct ContextResponse {
    pub user_id: String,
    pub platform: String,
    pub history: Vec<ConversationTurn>,
    pub count: usize,
}

/// Context clear reply
#[derive(Debug, Serialize)]
pub struct ClearContextResponse {
    pub status: String,
    pub user_id: String,
    pub platform: String,
    pub messages_deleted: u64,
}

/// User listing reply
#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<ChatUser>,
    pub count: usize,
}

/// Retention purge request
#[derive(Debug, Deserialize)]
pub struct PurgeRequest {
    #[serde(default)]
    pub days: Option<i64>,
}

/// Retention purge reply
#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub status: String,
    pub deleted: u64,
    pub cutoff_days: i64,
    pub cutoff: DateTime<Utc>,
}

/// Conversation reset reply
#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub status: String,
    pub turns_before: i64,
    pub turns_after: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_defaults() {
        let req: ChatRequest =
            serde_json::from_str(r#"{"user_id":"u1","message":"halo"}"#).unwrap();
        assert_eq!(req.platform, "api");
        assert!(req.use_knowledge_base);
    }

    #[test]
    fn test_chat_request_explicit_fields() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"user_id":"u1","platform":"whatsapp","message":"halo","use_knowledge_base":false}"#,
        )
        .unwrap();
        assert_eq!(req.platform, "whatsapp");
        assert!(!req.use_knowledge_base);
    }

    #[test]
    fn test_webhook_request_metadata_is_optional() {
        let req: WebhookRequest =
            serde_json::from_str(r#"{"user_id":"u1","platform":"whatsapp","message":"halo"}"#)
                .unwrap();
        assert!(req.metadata.is_none());
    }

    #[test]
    fn test_webhook_reply_round_trips() {
        let reply = WebhookReply {
            status: "success".to_string(),
            user_id: "u1".to_string(),
            platform: "whatsapp".to_string(),
            response: "KSJPS adalah program...".to_string(),
            sources_used: 1,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&reply).unwrap();
        let back: WebhookReply = serde_json::from_str(&json).unwrap();
        assert_eq!(back.response, reply.response);
        assert_eq!(back.sources_used, 1);
    }

    #[test]
    fn test_knowledge_stats_skips_empty_fields() {
        let response = KnowledgeStatsResponse {
            status: "error".to_string(),
            collection: None,
            error: Some("unreachable".to_string()),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("collection"));
        assert!(json.contains("unreachable"));
    }
}
