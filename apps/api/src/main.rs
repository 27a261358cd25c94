mod analysis;
mod config;
mod db;
mod errors;
mod models;
mod modules;
mod routes;
mod scoring;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::cache::{InMemoryResultCache, RedisResultCache, ResultCache};
use crate::analysis::store::{InMemoryRecordStore, PgRecordStore, RecordStore};
use crate::analysis::{Orchestrator, OrchestratorSettings};
use crate::config::Config;
use crate::db::create_pool;
use crate::modules::default_modules;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Analysis API v{}", env!("CARGO_PKG_VERSION"));

    // Record store: PostgreSQL when configured, otherwise in process
    let store: Arc<dyn RecordStore> = match &config.database_url {
        Some(url) => {
            let store = PgRecordStore::new(create_pool(url, config.database_max_connections).await?);
            store.ensure_schema().await?;
            Arc::new(store)
        }
        None => {
            info!("DATABASE_URL not set, keeping results in memory");
            Arc::new(InMemoryRecordStore::new())
        }
    };

    // Result cache: Redis when configured, otherwise in process
    let cache: Arc<dyn ResultCache> = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            let cache = RedisResultCache::connect(&client).await?;
            info!("Redis result cache connected");
            Arc::new(cache)
        }
        None => {
            info!("REDIS_URL not set, using in-memory result cache");
            Arc::new(InMemoryResultCache::new())
        }
    };

    let settings = OrchestratorSettings::from(&config);
    info!(
        max_concurrent = settings.max_concurrent,
        reserved_priority_slots = settings.reserved_priority_slots,
        cache_ttl_secs = settings.cache_ttl.as_secs(),
        module_timeout_ms = settings.module_timeout.as_millis() as u64,
        "Orchestrator configured"
    );
    let orchestrator = Orchestrator::new(default_modules()?, cache, store, settings);

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
