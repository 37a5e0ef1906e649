mod config;
mod errors;
mod interview;
mod llm_client;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, StateBackend};
use crate::interview::manager::SessionManager;
use crate::interview::persistence::{
    FileStateStore, MemoryStateStore, RedisStateStore, StateStore,
};
use crate::interview::questions::{FallbackQuestionProvider, LlmQuestionProvider, QuestionProvider};
use crate::interview::scoring::{AnswerScorer, HeuristicAnswerScorer, LlmAnswerScorer};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on invalid env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Interview API v{}", env!("CARGO_PKG_VERSION"));

    // Question provider and scorer: LLM-backed when a key is configured
    let (questions, scorer) = build_collaborators(&config)?;

    // Session state store
    let store = build_store(&config)?;
    info!("State store initialized (backend: {})", store.backend());

    let session = SessionManager::load(questions, scorer, store)
        .await
        .context("Failed to load persisted session state")?;
    let state = AppState {
        session: Arc::new(session),
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_collaborators(
    config: &Config,
) -> Result<(Arc<dyn QuestionProvider>, Arc<dyn AnswerScorer>)> {
    match &config.anthropic_api_key {
        Some(key) => {
            let llm = LlmClient::new(key.clone(), config.llm_model.clone())?;
            info!("LLM client initialized (model: {})", llm.model());
            Ok((
                Arc::new(LlmQuestionProvider::new(llm.clone(), &config.interview_role)),
                Arc::new(LlmAnswerScorer(llm)),
            ))
        }
        None => {
            warn!("ANTHROPIC_API_KEY not set: using fallback questions and heuristic scoring");
            Ok((
                Arc::new(FallbackQuestionProvider),
                Arc::new(HeuristicAnswerScorer),
            ))
        }
    }
}

fn build_store(config: &Config) -> Result<Arc<dyn StateStore>> {
    let store: Arc<dyn StateStore> = match config.state_backend {
        StateBackend::File => Arc::new(FileStateStore::new(config.state_path.clone())),
        StateBackend::Redis => {
            let url = config.redis_url.clone().unwrap_or_default();
            let client = redis::Client::open(url)?;
            Arc::new(RedisStateStore::new(client, config.state_key.clone()))
        }
        StateBackend::Memory => Arc::new(MemoryStateStore::new()),
    };
    Ok(store)
}
