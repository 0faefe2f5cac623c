//! Strict-mode chat orchestration

use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use tracing::info;
use tracing::warn;

use super::prompts;
use crate::database::Database;
use crate::llm::ChatMessage;
use crate::llm::LlmService;
use crate::models::ConversationTurn;
use crate::models::TurnRole;
use crate::rag::format_context;
use crate::rag::KnowledgeRetriever;
use crate::vector_store::ScoredPassage;
use crate::Result;

/// How a message left the answering state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// Grounded (or explicitly ungrounded) answer from the LLM
    Answered,
    /// No qualifying passages; fixed refusal, no LLM call
    Refused,
    /// Retrieval faulted; fixed apology, no LLM call
    Degraded,
}

/// Final reply for one handled message
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub response: String,
    pub timestamp: DateTime<Utc>,
    pub sources_used: usize,
    pub kind: OutcomeKind,
}

impl ChatOutcome {
    fn refused() -> Self {
        Self {
            response: prompts::REFUSAL_TEXT.to_string(),
            timestamp: Utc::now(),
            sources_used: 0,
            kind: OutcomeKind::Refused,
        }
    }

    fn degraded() -> Self {
        Self {
            response: prompts::DEGRADED_TEXT.to_string(),
            timestamp: Utc::now(),
            sources_used: 0,
            kind: OutcomeKind::Degraded,
        }
    }
}

/// Orchestrator around retrieval, completion and persistence.
///
/// All collaborators are injected; the service holds no global state.
pub struct ChatService {
    database: Arc<Database>,
    retriever: Arc<KnowledgeRetriever>,
    llm: Arc<LlmService>,
    domain: String,
    history_window_hours: i64,
    history_max_turns: usize,
}

impl ChatService {
    pub fn new(
        database: Arc<Database>,
        retriever: Arc<KnowledgeRetriever>,
        llm: Arc<LlmService>,
        config: &crate::config::AppConfig,
    ) -> Self {
        Self {
            database,
            retriever,
            llm,
            domain: config.chat_domain().to_string(),
            history_window_hours: config.history_window_hours(),
            history_max_turns: config.history_max_turns(),
        }
    }

    /// Handle one incoming message end to end.
    ///
    /// With `use_knowledge` the answer must be grounded: zero qualifying
    /// passages yields the fixed refusal and a retrieval fault yields the
    /// degraded apology, both without calling the completion provider and
    /// without persisting anything. Turns are stored (user first, then
    /// assistant) only after a successful completion.
    pub async fn handle_message(
        &self,
        user_id: &str,
        platform: &str,
        message: &str,
        use_knowledge: bool,
    ) -> Result<ChatOutcome> {
        info!("Handling message from {} on {}", user_id, platform);

        if !use_knowledge {
            return self.answer(user_id, platform, message, None).await;
        }

        let passages = match self.retriever.retrieve(message).await {
            Ok(passages) => passages,
            Err(fault) => {
                warn!(
                    "Degraded reply for {} on {}: retrieval failed ({})",
                    user_id, platform, fault
                );
                return Ok(ChatOutcome::degraded());
            }
        };

        if passages.is_empty() {
            info!(
                "No grounding for message from {} on {}; refusing",
                user_id, platform
            );
            return Ok(ChatOutcome::refused());
        }

        self.answer(user_id, platform, message, Some(&passages))
            .await
    }

    async fn answer(
        &self,
        user_id: &str,
        platform: &str,
        message: &str,
        passages: Option<&[ScoredPassage]>,
    ) -> Result<ChatOutcome> {
        let history = self
            .database
            .history_for_prompt(
                user_id,
                platform,
                self.history_window_hours,
                self.history_max_turns,
            )
            .await?;

        let messages = assemble_messages(&self.domain, passages, &history, message);

        // Provider failures propagate; no turns are persisted for them
        let answer = self.llm.chat(&messages).await?;

        // User turn first, then the assistant turn
        self.database
            .append_turn(user_id, platform, TurnRole::User, message)
            .await?;
        self.database
            .append_turn(user_id, platform, TurnRole::Assistant, &answer)
            .await?;

        let sources_used = passages.map_or(0, <[ScoredPassage]>::len);
        info!(
            "Answered {} on {} with {} grounding passages",
            user_id, platform, sources_used
        );

        Ok(ChatOutcome {
            response: answer,
            timestamp: Utc::now(),
            sources_used,
            kind: OutcomeKind::Answered,
        })
    }
}

/// Prompt assembly: system instructions first, replayed history in
/// chronological order, the new user message last. Stored system turns are
/// skipped; that slot belongs to the instructions.
fn assemble_messages(
    domain: &str,
    passages: Option<&[ScoredPassage]>,
    history: &[ConversationTurn],
    message: &str,
) -> Vec<ChatMessage> {
    let system = match passages {
        Some(passages) => prompts::strict_system_prompt(domain, &format_context(passages)),
        None => prompts::ungrounded_system_prompt(domain),
    };

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system));

    for turn in history {
        match turn.role() {
            TurnRole::User => messages.push(ChatMessage::user(turn.message.clone())),
            TurnRole::Assistant => messages.push(ChatMessage::assistant(turn.message.clone())),
            TurnRole::System => {}
        }
    }

    messages.push(ChatMessage::user(message.to_string()));
    messages
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::config::AppConfig;
    use crate::embeddings::EmbeddingService;
    use crate::vector_store::VectorStoreClient;

    fn turn(role: TurnRole, message: &str) -> ConversationTurn {
        ConversationTurn {
            id: 1,
            user_id: "62812".to_string(),
            platform: "whatsapp".to_string(),
            role: role.as_str().to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
        }
    }

    fn passage(score: f32, text: &str) -> ScoredPassage {
        ScoredPassage {
            id: "p".to_string(),
            score,
            text: text.to_string(),
            metadata: Value::Null,
        }
    }

    #[test]
    fn test_assembly_order_system_history_user() {
        let history = vec![
            turn(TurnRole::User, "Halo"),
            turn(TurnRole::Assistant, "Halo! Ada yang bisa dibantu?"),
        ];
        let passages = vec![passage(0.8, "KSJPS adalah program jaminan sosial.")];
        let messages = assemble_messages("layanan KSJPS", Some(&passages), &history, "Apa itu KSJPS?");

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("Informasi dari knowledge base:"));
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "Halo");
        assert_eq!(messages[2].role, "assistant");
        assert_eq!(messages[3].role, "user");
        assert_eq!(messages[3].content, "Apa itu KSJPS?");
    }

    #[test]
    fn test_stored_system_turns_are_not_replayed() {
        let history = vec![turn(TurnRole::System, "internal note")];
        let messages = assemble_messages("layanan KSJPS", None, &history, "Halo");
        assert_eq!(messages.len(), 2);
        assert!(!messages.iter().any(|m| m.content == "internal note"));
    }

    #[test]
    fn test_ungrounded_assembly_has_plain_system_prompt() {
        let messages = assemble_messages("layanan KSJPS", None, &[], "Halo");
        assert_eq!(messages.len(), 2);
        assert!(!messages[0].content.contains("knowledge base"));
    }

    fn offline_service() -> ChatService {
        let mut config = AppConfig::default();
        config.embeddings.url = "http://127.0.0.1:9".to_string();
        config.vector_store.url = "http://127.0.0.1:9".to_string();
        config.llm.api_url = "http://127.0.0.1:9".to_string();

        let embeddings = Arc::new(EmbeddingService::from_config(&config).unwrap());
        let store = Arc::new(VectorStoreClient::from_config(&config, embeddings.clone()).unwrap());
        let retriever = Arc::new(KnowledgeRetriever::new(store, embeddings, &config));
        let llm = Arc::new(LlmService::from_config(&config).unwrap());
        // Lazy pool: connecting would fail, so a degraded reply reaching
        // the database would surface as an error in these tests
        let pool = sqlx::postgres::PgPool::connect_lazy("postgresql://u:p@127.0.0.1:1/none")
            .unwrap();
        let database = Arc::new(Database::new(pool));

        ChatService::new(database, retriever, llm, &config)
    }

    #[tokio::test]
    async fn test_retrieval_fault_degrades_without_llm_or_persistence() {
        let service = offline_service();
        let outcome = service
            .handle_message("62812", "whatsapp", "Apa itu KSJPS?", true)
            .await
            .unwrap();

        assert_eq!(outcome.kind, OutcomeKind::Degraded);
        assert_eq!(outcome.response, prompts::DEGRADED_TEXT);
        assert_eq!(outcome.sources_used, 0);
    }
}
