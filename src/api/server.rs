//! HTTP server implementation

use std::sync::Arc;

use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing::warn;

use crate::api::handlers::AppState;
use crate::api::routes;
use crate::chat::ChatService;
use crate::config::AppConfig;
use crate::database::Database;
use crate::dedup::DedupCoordinator;
use crate::embeddings::EmbeddingService;
use crate::llm::LlmService;
use crate::rag::KnowledgeRetriever;
use crate::vector_store::VectorStoreClient;
use crate::Result;

/// Start the API server
pub async fn serve_api(
    config: &AppConfig,
    host: String,
    port: u16,
    enable_cors: bool,
) -> Result<()> {
    info!("🚀 Starting ChatRAG API server...");

    // Initialize services
    let database = Arc::new(Database::from_config(config).await?);
    database.init_schema().await?;

    let embeddings = Arc::new(EmbeddingService::from_config(config)?);
    let vector_store = Arc::new(VectorStoreClient::from_config(config, embeddings.clone())?);
    let llm = Arc::new(LlmService::from_config(config)?);
    let retriever = Arc::new(KnowledgeRetriever::new(
        vector_store.clone(),
        embeddings.clone(),
        config,
    ));
    let chat = Arc::new(ChatService::new(
        database.clone(),
        retriever.clone(),
        llm.clone(),
        config,
    ));
    let dedup = Arc::new(DedupCoordinator::from_config(config));

    // The server still starts when the vector store or the embedding
    // model is down; retrieval degrades per message until they recover.
    if let Err(e) = vector_store.ensure_collection().await {
        warn!("⚠️  Vector store not ready: {}", e);
    }
    if embeddings.is_ready().await {
        info!("✅ Embedding model '{}' available", config.embedding_model());
    } else {
        warn!(
            "⚠️  Embedding model '{}' not available yet",
            config.embedding_model()
        );
    }
    if llm.is_configured() {
        info!("✅ LLM provider configured (model '{}')", llm.model());
    } else {
        warn!("⚠️  LLM API key not set - chat requests will fail");
    }
    if dedup.is_active() {
        info!("✅ Webhook dedup active");
    } else {
        info!("💡 Webhook dedup disabled - duplicate deliveries are processed");
    }

    let state = AppState {
        database,
        embeddings,
        vector_store,
        retriever,
        chat,
        dedup,
        llm,
        retention_days: config.retention_days(),
        context_read_limit: config.context_read_limit(),
    };

    // Build API routes
    let api_router = routes::api_routes(state);
    let mut app = Router::new().nest("/api", api_router);

    // Add middleware layers
    app = app
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    // Add CORS if enabled
    if enable_cors {
        info!("✅ CORS enabled");
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    // Start server
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🌐 API server listening on http://{}", addr);
    info!("");
    info!("Available endpoints:");
    info!("  GET    /api/                          - Service banner");
    info!("  GET    /api/health                    - Health check");
    info!("  POST   /api/chat                      - Direct chat");
    info!("  POST   /api/webhook/message           - Inbound webhook (deduplicated)");
    info!("  POST   /api/knowledge/add             - Add knowledge documents");
    info!("  GET    /api/knowledge/search          - Search knowledge base");
    info!("  GET    /api/knowledge/stats           - Knowledge collection stats");
    info!("  DELETE /api/knowledge/:id             - Remove a knowledge document");
    info!("  GET    /api/context/:user/:platform   - Conversation history");
    info!("  DELETE /api/context/:user/:platform   - Clear conversation history");
    info!("  GET    /api/context/:user/:platform/stats - Per-user stats");
    info!("  GET    /api/users                     - List known users");
    info!("  POST   /api/admin/purge               - Retention purge");
    info!("  POST   /api/admin/reset               - Full conversation reset");

    axum::serve(listener, app).await?;

    Ok(())
}
