use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use chatrag::chat::ChatService;
use chatrag::chat::OutcomeKind;
use chatrag::database::Database;
use chatrag::dedup::DedupCoordinator;
use chatrag::embeddings::EmbeddingService;
use chatrag::llm::LlmService;
use chatrag::models::TurnRole;
use chatrag::rag::KnowledgeRetriever;
use chatrag::vector_store::DocumentInput;
use chatrag::vector_store::VectorStoreClient;
use chatrag::AppConfig;
use chatrag::ChatRagError;
use chatrag::Result;
use serde::Deserialize;
use serde::Serialize;

async fn setup_test_db() -> Result<Database> {
    // Load configuration from config.toml
    let config = AppConfig::load()?;

    let db = Database::from_config(&config).await?;

    // Initialize schema
    db.init_schema().await?;

    Ok(db)
}

fn unique_user(tag: &str) -> String {
    format!("it-{}-{}", tag, chrono::Utc::now().timestamp_millis())
}

#[tokio::test]
#[ignore = "Requires a running Postgres instance"]
async fn test_get_or_create_user_is_idempotent() -> Result<()> {
    let db = setup_test_db().await?;
    let user_id = unique_user("idem");

    let first = db.get_or_create_user(&user_id, "test").await?;
    let second = db.get_or_create_user(&user_id, "test").await?;
    assert_eq!(first.id, second.id);

    let users = db.list_users().await?;
    assert!(users.iter().any(|u| u.user_id == user_id));

    db.delete_user(&user_id, "test").await?;
    Ok(())
}

#[tokio::test]
#[ignore = "Requires a running Postgres instance"]
async fn test_bounded_history_keeps_newest_in_order() -> Result<()> {
    let db = setup_test_db().await?;
    let user_id = unique_user("history");

    for i in 0..5 {
        let role = if i % 2 == 0 {
            TurnRole::User
        } else {
            TurnRole::Assistant
        };
        db.append_turn(&user_id, "test", role, &format!("turn {}", i))
            .await?;
    }

    let history = db.bounded_history(&user_id, "test", 3).await?;
    assert_eq!(history.len(), 3);
    // The cap drops the oldest turns, and read-back is chronological
    assert_eq!(history[0].message, "turn 2");
    assert_eq!(history[1].message, "turn 3");
    assert_eq!(history[2].message, "turn 4");
    assert!(history[0].timestamp <= history[2].timestamp);

    db.delete_user(&user_id, "test").await?;
    Ok(())
}

#[tokio::test]
#[ignore = "Requires a running Postgres instance"]
async fn test_clear_history_reports_deleted_count() -> Result<()> {
    let db = setup_test_db().await?;
    let user_id = unique_user("clear");

    db.append_turn(&user_id, "test", TurnRole::User, "halo")
        .await?;
    db.append_turn(&user_id, "test", TurnRole::Assistant, "halo juga")
        .await?;

    let deleted = db.clear_history(&user_id, "test").await?;
    assert_eq!(deleted, 2);

    // The user identity survives a clear with an empty conversation
    let stats = db.user_stats(&user_id, "test").await?;
    let stats = stats.expect("user should still exist");
    assert_eq!(stats.message_count, 0);
    assert!(stats.last_seen.is_none());

    db.delete_user(&user_id, "test").await?;
    Ok(())
}

#[tokio::test]
#[ignore = "Requires a running Postgres instance"]
async fn test_user_stats_for_unknown_user_is_none() -> Result<()> {
    let db = setup_test_db().await?;

    let stats = db.user_stats(&unique_user("ghost"), "test").await?;
    assert!(stats.is_none());

    Ok(())
}

#[tokio::test]
#[ignore = "Requires a running Postgres instance"]
async fn test_delete_unknown_user_is_not_found() -> Result<()> {
    let db = setup_test_db().await?;

    let err = db
        .delete_user(&unique_user("missing"), "test")
        .await
        .unwrap_err();
    assert!(matches!(err, ChatRagError::UserNotFound(_, _)));

    Ok(())
}

#[tokio::test]
#[ignore = "Requires a running Postgres instance"]
async fn test_retention_purge_removes_only_turns_past_cutoff() -> Result<()> {
    let db = setup_test_db().await?;
    let user_id = unique_user("purge");

    // One fresh turn through the normal path, one backdated well past
    // the retention window
    db.append_turn(&user_id, "test", TurnRole::User, "fresh")
        .await?;
    sqlx::query(
        r#"
        INSERT INTO conversations (user_id, platform, role, message, "timestamp")
        VALUES ($1, 'test', 'user', 'stale', NOW() - INTERVAL '100 days')
        "#,
    )
    .bind(&user_id)
    .execute(db.pool())
    .await?;

    let cutoff = chrono::Utc::now() - chrono::Duration::days(90);
    let deleted = db.purge_older_than(cutoff).await?;
    assert!(deleted >= 1);

    let history = db.bounded_history(&user_id, "test", 10).await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].message, "fresh");

    db.delete_user(&user_id, "test").await?;
    Ok(())
}

#[tokio::test]
#[ignore = "Requires a running Postgres instance"]
async fn test_recent_window_excludes_turns_outside_lookback() -> Result<()> {
    let db = setup_test_db().await?;
    let user_id = unique_user("window");

    db.append_turn(&user_id, "test", TurnRole::User, "recent")
        .await?;
    sqlx::query(
        r#"
        INSERT INTO conversations (user_id, platform, role, message, "timestamp")
        VALUES ($1, 'test', 'assistant', 'yesterday', NOW() - INTERVAL '48 hours')
        "#,
    )
    .bind(&user_id)
    .execute(db.pool())
    .await?;

    // A 24h lookback sees only the fresh turn
    let windowed = db.recent_window(&user_id, "test", 24).await?;
    assert_eq!(windowed.len(), 1);
    assert_eq!(windowed[0].message, "recent");

    // A 72h lookback sees both, oldest first
    let wide = db.recent_window(&user_id, "test", 72).await?;
    assert_eq!(wide.len(), 2);
    assert_eq!(wide[0].message, "yesterday");
    assert_eq!(wide[1].message, "recent");

    db.delete_user(&user_id, "test").await?;
    Ok(())
}

#[tokio::test]
#[ignore = "Requires a running Postgres instance"]
async fn test_reset_reports_before_and_after_counts() -> Result<()> {
    let db = setup_test_db().await?;
    let user_id = unique_user("reset");

    db.append_turn(&user_id, "test", TurnRole::User, "halo")
        .await?;

    let (before, after) = db.reset_all_conversations().await?;
    assert!(before >= 1);
    assert_eq!(after, 0);

    db.delete_user(&user_id, "test").await?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DeliveryReply {
    text: String,
}

#[tokio::test]
#[ignore = "Requires a running Redis instance"]
async fn test_concurrent_duplicate_deliveries_process_once() -> Result<()> {
    let config = AppConfig::load()?;
    let coordinator = DedupCoordinator::from_config(&config);
    assert!(coordinator.is_active());

    let user_id = unique_user("dedup");
    let message = "Apa itu KSJPS?";
    let calls = Arc::new(AtomicUsize::new(0));

    let process = |calls: Arc<AtomicUsize>| {
        move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            // Hold the claim long enough for the duplicate to overlap
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            Ok(DeliveryReply {
                text: "KSJPS adalah program...".to_string(),
            })
        }
    };

    let (first, second) = tokio::join!(
        coordinator.run(&user_id, "whatsapp", message, process(calls.clone())),
        coordinator.run(&user_id, "whatsapp", message, process(calls.clone())),
    );

    let first = first?;
    let second = second?;

    // Exactly one pipeline run, both callers get the same reply
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);

    Ok(())
}

#[tokio::test]
#[ignore = "Requires a running Redis instance"]
async fn test_failed_attempt_does_not_block_retry() -> Result<()> {
    let config = AppConfig::load()?;
    let coordinator = DedupCoordinator::from_config(&config);
    assert!(coordinator.is_active());

    let user_id = unique_user("retry");
    let message = "Apa itu KSJPS?";

    let err = coordinator
        .run(&user_id, "whatsapp", message, || async {
            Err::<DeliveryReply, _>(ChatRagError::LlmError("provider down".to_string()))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ChatRagError::LlmError(_)));

    // The failed claim was released, so a redelivery processes normally
    let reply: DeliveryReply = coordinator
        .run(&user_id, "whatsapp", message, || async {
            Ok(DeliveryReply {
                text: "KSJPS adalah program...".to_string(),
            })
        })
        .await?;
    assert_eq!(reply.text, "KSJPS adalah program...");

    Ok(())
}

#[tokio::test]
#[ignore = "Requires running Postgres, Qdrant and Ollama instances"]
async fn test_refusal_path_skips_llm_and_persists_nothing() -> Result<()> {
    let mut config = AppConfig::load()?;
    // An impossible threshold guarantees empty retrieval; a dead LLM
    // endpoint proves the refusal path never calls the provider
    config.retrieval.score_threshold = 0.99;
    config.llm.api_url = "http://127.0.0.1:9".to_string();
    config.llm.api_key = "test-key".to_string();

    let db = Arc::new(Database::from_config(&config).await?);
    db.init_schema().await?;

    let embeddings = Arc::new(EmbeddingService::from_config(&config)?);
    let vector_store = Arc::new(VectorStoreClient::from_config(&config, embeddings.clone())?);
    vector_store.ensure_collection().await?;

    let retriever = Arc::new(KnowledgeRetriever::new(
        vector_store,
        embeddings,
        &config,
    ));
    let llm = Arc::new(LlmService::from_config(&config)?);
    let chat = ChatService::new(db.clone(), retriever, llm, &config);

    let user_id = unique_user("refusal");
    let outcome = chat
        .handle_message(&user_id, "whatsapp", "Siapa presiden pertama Mars?", true)
        .await?;

    assert_eq!(outcome.kind, OutcomeKind::Refused);
    assert_eq!(outcome.response, chatrag::chat::REFUSAL_TEXT);
    assert_eq!(outcome.sources_used, 0);

    // A refused message leaves no trace in the conversation store
    let history = db.bounded_history(&user_id, "whatsapp", 10).await?;
    assert!(history.is_empty());

    Ok(())
}

#[tokio::test]
#[ignore = "Requires running Postgres, Qdrant, Ollama and an LLM API key"]
async fn test_end_to_end_grounded_chat() -> Result<()> {
    let config = AppConfig::load()?;

    let db = Arc::new(Database::from_config(&config).await?);
    db.init_schema().await?;

    let embeddings = Arc::new(EmbeddingService::from_config(&config)?);
    let vector_store = Arc::new(VectorStoreClient::from_config(&config, embeddings.clone())?);
    vector_store.ensure_collection().await?;

    // Seed one passage so retrieval has something to ground on
    vector_store
        .upsert_documents(&[DocumentInput {
            text: "KSJPS adalah program kerja sama jaminan sosial untuk warga."
                .to_string(),
            metadata: None,
            id: None,
        }])
        .await?;

    let retriever = Arc::new(KnowledgeRetriever::new(
        vector_store,
        embeddings,
        &config,
    ));
    let llm = Arc::new(LlmService::from_config(&config)?);
    let chat = ChatService::new(db.clone(), retriever, llm, &config);

    let user_id = unique_user("e2e");
    let outcome = chat
        .handle_message(&user_id, "whatsapp", "Apa itu KSJPS?", true)
        .await?;

    assert_eq!(outcome.kind, OutcomeKind::Answered);
    assert!(outcome.sources_used >= 1);
    assert!(!outcome.response.is_empty());

    // One user turn and one assistant turn were persisted
    let history = db.bounded_history(&user_id, "whatsapp", 10).await?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, "user");
    assert_eq!(history[1].role, "assistant");

    db.delete_user(&user_id, "whatsapp").await?;
    Ok(())
}
