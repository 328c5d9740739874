pub mod api;
pub mod config;
pub mod error;
pub mod state;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use config::{EmbeddingBackend, ServerConfig};
use pdf_qa_core::{
    AnswerSynthesizer, CharacterNgramEmbedder, ChatCompletionProvider, Embedder, HttpEmbedder,
    IngestPipeline, LocalBertEmbedder, QaService,
};
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use config::{Cli, ConfigError};
pub use error::ApiError;

/// Routes for the JSON API plus the static front end as fallback.
pub fn build_router(state: Arc<AppState>) -> Router {
    let index = ServeFile::new(state.frontend_dir.join("index.html"));
    let assets = ServeDir::new(&state.frontend_dir);
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .route("/health", get(api::health))
        .route("/api/status", get(api::status))
        .route("/api/upload", post(api::upload).layer(upload_limit))
        .route("/api/ask", post(api::ask))
        .route_service("/", index)
        .fallback_service(assets)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub fn build_embedder(backend: &EmbeddingBackend) -> anyhow::Result<Arc<dyn Embedder>> {
    match backend {
        EmbeddingBackend::LocalBert { model_dir } => {
            let embedder = LocalBertEmbedder::load(model_dir)
                .with_context(|| format!("loading embedding model from {}", model_dir.display()))?;
            Ok(Arc::new(embedder))
        }
        EmbeddingBackend::Http(config) => {
            let embedder = HttpEmbedder::new(config.clone())?;
            info!(
                endpoint = embedder.endpoint(),
                model = %config.model,
                dimensions = config.dimensions,
                "using remote embeddings"
            );
            Ok(Arc::new(embedder))
        }
        EmbeddingBackend::CharacterNgram { dimensions } => {
            warn!(
                dimensions,
                "using character n-gram embeddings; retrieval quality will be lower than with a sentence model"
            );
            Ok(Arc::new(CharacterNgramEmbedder {
                dimensions: *dimensions,
            }))
        }
    }
}

pub fn build_service(config: &ServerConfig) -> anyhow::Result<QaService> {
    let embedder = build_embedder(&config.embedding)?;
    let pipeline = IngestPipeline::new(config.chunking, embedder)?;
    let provider = ChatCompletionProvider::new(config.llm.clone())?;
    info!(endpoint = %provider.endpoint(), model = provider.model(), "language model configured");

    Ok(QaService::new(pipeline, AnswerSynthesizer::new(Arc::new(provider))).with_top_k(config.top_k))
}

pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.uploads_dir)
        .await
        .with_context(|| format!("creating uploads dir {}", config.uploads_dir.display()))?;
    if !config.frontend_dir.join("index.html").is_file() {
        warn!(frontend_dir = %config.frontend_dir.display(), "front end not found; only the API will be served");
    }

    let service = build_service(&config)?;
    let state = AppState::new(service, &config.uploads_dir, &config.frontend_dir)
        .with_max_upload_bytes(config.max_upload_bytes);
    let app = build_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("binding {}", config.addr))?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        addr = %config.addr,
        uploads_dir = %config.uploads_dir.display(),
        "pdf-qa-server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("pdf-qa-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
