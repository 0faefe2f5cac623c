use std::sync::Arc;

use chatrag::config::AppConfig;
use chatrag::database::Database;
use chatrag::embeddings::EmbeddingService;
use chatrag::rag::KnowledgeRetriever;
use chatrag::vector_store::DocumentInput;
use chatrag::vector_store::VectorStoreClient;
use chatrag::Result;
use clap::Parser;
use clap::Subcommand;
use tracing::info;

#[derive(Parser)]
#[command(name = "chatrag")]
#[command(about = "RAG chatbot backend for messaging-platform webhooks")]
#[command(version)]
struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve {
        /// Bind address
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Bind port
        #[arg(short, long, default_value = "8000")]
        port: u16,
        /// Enable permissive CORS
        #[arg(long)]
        cors: bool,
    },
    /// Initialize the database schema and the knowledge collection
    Init,
    /// Load knowledge documents from a JSON file
    Ingest {
        /// Path to a JSON array of { text, metadata?, id? } documents
        file: String,
    },
    /// Search the knowledge base
    Search {
        /// Search query
        query: String,
        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
        /// Minimum similarity score
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Show knowledge-base and conversation statistics
    Stats,
    /// Delete conversation turns older than the retention window
    Purge {
        /// Retention cutoff in days (default: configured retention)
        #[arg(long)]
        days: Option<i64>,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Delete ALL conversation turns
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        chatrag::logging::init_logging_with_level("debug")?;
    } else {
        chatrag::logging::init_logging()?;
    }

    // Load configuration
    let config = AppConfig::load()?;
    info!("Configuration loaded successfully");

    // Execute the requested command
    match cli.command {
        Commands::Serve { host, port, cors } => {
            chatrag::api::serve_api(&config, host, port, cors).await?;
        }
        Commands::Init => {
            handle_init_command(&config).await?;
        }
        Commands::Ingest { file } => {
            handle_ingest_command(&config, &file).await?;
        }
        Commands::Search {
            query,
            limit,
            threshold,
        } => {
            handle_search_command(&config, &query, limit, threshold).await?;
        }
        Commands::Stats => {
            handle_stats_command(&config).await?;
        }
        Commands::Purge { days, force } => {
            handle_purge_command(&config, days, force).await?;
        }
        Commands::Reset { force } => {
            handle_reset_command(&config, force).await?;
        }
        Commands::Config => {
            handle_config_command(&config)?;
        }
    }

    Ok(())
}

async fn handle_init_command(config: &AppConfig) -> Result<()> {
    println!("🔧 Initializing ChatRAG...");

    let database = Database::from_config(config).await?;
    database.init_schema().await?;
    println!("  ✅ Database schema ready");

    let embeddings = Arc::new(EmbeddingService::from_config(config)?);
    let vector_store = VectorStoreClient::from_config(config, embeddings.clone())?;
    vector_store.ensure_collection().await?;
    println!(
        "  ✅ Collection '{}' ready ({} dimensions)",
        config.collection_name(),
        config.embedding_dimension()
    );

    if embeddings.is_ready().await {
        println!(
            "  ✅ Embedding model '{}' available",
            config.embedding_model()
        );
    } else {
        println!(
            "  ⚠️  Embedding model '{}' not available - pull it in Ollama first",
            config.embedding_model()
        );
    }

    println!("✅ Initialization complete!");
    Ok(())
}

async fn handle_ingest_command(config: &AppConfig, file: &str) -> Result<()> {
    let raw = std::fs::read_to_string(file)?;
    let documents: Vec<DocumentInput> = serde_json::from_str(&raw)?;

    if documents.is_empty() {
        println!("📥 No documents found in {}", file);
        return Ok(());
    }

    println!("📥 Ingesting {} documents from {}...", documents.len(), file);

    let embeddings = Arc::new(EmbeddingService::from_config(config)?);
    let vector_store = VectorStoreClient::from_config(config, embeddings)?;
    vector_store.ensure_collection().await?;

    let added = vector_store.upsert_documents(&documents).await?;
    println!(
        "✅ Added {} documents to '{}'",
        added,
        config.collection_name()
    );
    Ok(())
}

async fn handle_search_command(
    config: &AppConfig,
    query: &str,
    limit: usize,
    threshold: Option<f32>,
) -> Result<()> {
    println!("🔍 Searching knowledge base for: \"{}\"", query);
    println!();

    let embeddings = Arc::new(EmbeddingService::from_config(config)?);
    let vector_store = Arc::new(VectorStoreClient::from_config(config, embeddings.clone())?);
    let retriever = KnowledgeRetriever::new(vector_store, embeddings, config);

    let results = retriever
        .search_knowledge(query, Some(limit), threshold)
        .await;

    if results.is_empty() {
        println!("No passages found above the score threshold.");
        return Ok(());
    }

    println!("Found {} passages:", results.len());
    for (i, passage) in results.iter().enumerate() {
        let preview: String = passage.text.chars().take(200).collect();
        let text_display = if passage.text.chars().count() > 200 {
            format!("{}...", preview)
        } else {
            preview
        };
        println!();
        println!("  {}. Score: {:.3} | ID: {}", i + 1, passage.score, passage.id);
        println!("     {}", text_display);
    }

    Ok(())
}

async fn handle_stats_command(config: &AppConfig) -> Result<()> {
    println!("📊 ChatRAG Statistics");
    println!("=====================");

    let embeddings = Arc::new(EmbeddingService::from_config(config)?);
    let vector_store = VectorStoreClient::from_config(config, embeddings)?;

    println!();
    println!("🧠 Knowledge base:");
    match vector_store.collection_info().await {
        Ok(info) => {
            println!("  Collection: {}", info.name);
            println!("  Points: {}", info.points_count);
            println!("  Vectors: {}", info.vectors_count);
            println!("  Status: {}", info.status);
        }
        Err(e) => {
            println!("  Unavailable: {}", e);
        }
    }

    let database = Database::from_config(config).await?;
    database.verify_schema_or_error().await?;
    let stats = database.conversation_stats().await?;

    println!();
    println!("💬 Conversations:");
    println!("  Users: {}", stats.total_users);
    println!("  Turns: {}", stats.total_turns);

    Ok(())
}

async fn handle_purge_command(config: &AppConfig, days: Option<i64>, force: bool) -> Result<()> {
    let days = days.unwrap_or(config.retention_days());
    if days < 0 {
        return Err(chatrag::ChatRagError::Custom(
            "Retention cutoff must be non-negative".to_string(),
        ));
    }

    if !force
        && !confirm(&format!(
            "⚠️  This will delete all conversation turns older than {} days!",
            days
        ))?
    {
        println!("Operation cancelled.");
        return Ok(());
    }

    let database = Database::from_config(config).await?;
    database.verify_schema_or_error().await?;

    let cutoff = chrono::Utc::now() - chrono::Duration::days(days);
    let deleted = database.purge_older_than(cutoff).await?;
    println!(
        "✅ Purged {} turns older than {} days (cutoff {})",
        deleted, days, cutoff
    );
    Ok(())
}

async fn handle_reset_command(config: &AppConfig, force: bool) -> Result<()> {
    if !force && !confirm("⚠️  This will delete ALL conversation history!")? {
        println!("Operation cancelled.");
        return Ok(());
    }

    let database = Database::from_config(config).await?;
    database.verify_schema_or_error().await?;

    let (before, after) = database.reset_all_conversations().await?;
    println!("✅ Conversations reset: {} turns -> {}", before, after);
    Ok(())
}

fn confirm(warning: &str) -> Result<bool> {
    println!("{}", warning);
    println!("Are you sure you want to continue? (y/N)");

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_lowercase().starts_with('y'))
}

fn handle_config_command(config: &AppConfig) -> Result<()> {
    println!("📋 ChatRAG Configuration:");
    println!();

    println!("🗄️  Database:");
    println!("  URL: {}", mask_database_url(config.database_url()));
    println!("  Max connections: {}", config.max_connections());
    println!("  Min connections: {}", config.min_connections());
    println!("  Connection timeout: {}s", config.connection_timeout());
    println!();

    println!("📝 Logging:");
    println!("  Level: {}", config.logging.level);
    println!("  Backtrace: {}", config.logging.backtrace);
    println!();

    println!("🧠 Embeddings:");
    println!("  URL: {}", config.embeddings_url());
    println!("  Model: {}", config.embedding_model());
    println!("  Dimension: {}", config.embedding_dimension());
    println!();

    println!("🗂️  Vector store:");
    println!("  URL: {}", config.vector_store_url());
    println!("  Collection: {}", config.collection_name());
    println!("  Max results: {}", config.max_results());
    println!("  Score threshold: {}", config.score_threshold());
    println!();

    println!("🤖 LLM:");
    println!("  API URL: {}", config.llm_api_url());
    println!("  API key: {}", mask_api_key(config.llm_api_key()));
    println!("  Model: {}", config.llm_model());
    println!("  Temperature: {}", config.llm.temperature);
    println!("  Max tokens: {}", config.llm.max_tokens);
    println!();

    println!("💬 Chat:");
    println!("  Domain: {}", config.chat_domain());
    println!("  History window: {}h", config.history_window_hours());
    println!("  History max turns: {}", config.history_max_turns());
    println!("  Context read limit: {}", config.context_read_limit());
    println!("  Retention: {} days", config.retention_days());
    println!();

    println!("🔁 Dedup:");
    println!("  Enabled: {}", config.dedup_enabled());
    println!("  Redis URL: {}", config.redis_url());
    println!("  TTL: {}s", config.dedup.ttl_secs);
    println!("  Wait: {}ms", config.dedup.wait_ms);

    Ok(())
}

/// Mask database URL for display (hide password)
fn mask_database_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        if let Some(host) = parsed.host_str() {
            format!(
                "{}://{}@{}:{}",
                parsed.scheme(),
                parsed.username(),
                host,
                parsed.port().unwrap_or(5432)
            )
        } else {
            "***masked***".to_string()
        }
    } else {
        "***invalid***".to_string()
    }
}

fn mask_api_key(key: &str) -> String {
    if key.is_empty() {
        "(not set)".to_string()
    } else if key.chars().count() > 8 {
        let prefix: String = key.chars().take(4).collect();
        format!("{}****", prefix)
    } else {
        "****".to_string()
    }
}
