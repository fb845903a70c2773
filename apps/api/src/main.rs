mod analysis;
mod cache;
mod config;
mod db;
mod errors;
mod llm_client;
mod matching;
mod models;
mod routes;
mod state;
mod store;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::ResumeAnalyzer;
use crate::cache::{AnalysisCache, CacheBackend, InMemoryBackend, RedisBackend};
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::{CallPolicy, CompletionOracle, LlmClient};
use crate::matching::{BatchCoordinator, EngineSettings, MatchEngine, ScoringOracleClient};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{PgMatchStore, PgProfileStore, ProfileStore, UpsertStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting matcher v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url, config.database_max_connections).await?;

    // Cache backend: Redis when configured, otherwise process-local
    let backend: Arc<dyn CacheBackend> = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            info!("Redis cache backend configured");
            Arc::new(RedisBackend::new(client))
        }
        None => {
            info!("Using in-memory cache backend (single instance only)");
            Arc::new(InMemoryBackend::new())
        }
    };

    // Initialize LLM client
    let oracle: Arc<dyn CompletionOracle> = Arc::new(LlmClient::new(config.anthropic_api_key.clone())?);
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // One limiter for every oracle call site
    let limiter = Arc::new(Semaphore::new(config.oracle.max_in_flight));
    let policy = |timeout: Duration| {
        CallPolicy::new(timeout, config.oracle.max_retries).with_limiter(limiter.clone())
    };

    let match_cache = Arc::new(AnalysisCache::new(backend.clone(), "match", config.cache.match_ttl));
    let analysis_cache = Arc::new(AnalysisCache::new(backend, "analysis", config.cache.analysis_ttl));
    let engine_settings = EngineSettings {
        fan_out: config.batch.fan_out,
        failure_score: Some(config.batch.failed_match_score),
    };

    let profiles: Arc<dyn ProfileStore> = Arc::new(PgProfileStore::new(db.clone()));
    let upserts = Arc::new(UpsertStore::new(
        Arc::new(PgMatchStore::new(db)),
        config.batch.upsert_chunk_size,
    ));

    let engine = Arc::new(MatchEngine::new(
        ScoringOracleClient::new(oracle.clone(), policy(config.oracle.match_timeout)),
        match_cache.clone(),
        engine_settings.clone(),
    ));
    let batch_engine = Arc::new(MatchEngine::new(
        ScoringOracleClient::new(oracle.clone(), policy(config.oracle.batch_timeout)),
        match_cache,
        engine_settings,
    ));
    let coordinator = Arc::new(BatchCoordinator::new(
        profiles.clone(),
        batch_engine,
        upserts.clone(),
        config.batch.chunk_size,
    ));
    let analyzer = Arc::new(ResumeAnalyzer::new(
        profiles.clone(),
        oracle,
        policy(config.oracle.analysis_timeout),
        analysis_cache,
    ));

    // Build app state
    let state = AppState {
        profiles,
        engine,
        coordinator,
        upserts,
        analyzer,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
