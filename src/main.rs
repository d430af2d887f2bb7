mod api;
mod area;
mod config;
mod db;
mod error;
mod extraction;
mod fetcher;
mod state;
mod types;
mod valuation;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::{router, ApiState};
use crate::area::{AreaPriceNormalizer, AreaStatCache};
use crate::config::{CacheBackend, Config, CACHE_TTL_DAYS};
use crate::db::SqliteStatCache;
use crate::error::Result;
use crate::extraction::{ListingExtractor, OpenAiExtractor};
use crate::fetcher::configured_sources;
use crate::state::MemoryStatCache;
use crate::valuation::Valuator;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Area statistics cache ---
    let cache: Arc<dyn AreaStatCache> = match cfg.cache_backend {
        CacheBackend::Sqlite => {
            let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", cfg.db_path))?
                .create_if_missing(true);
            let pool = SqlitePoolOptions::new().connect_with(options).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Area statistics cache ready at {}", cfg.db_path);
            Arc::new(SqliteStatCache::new(pool))
        }
        CacheBackend::Memory => {
            warn!("CACHE_BACKEND=memory: area statistics are lost on restart");
            Arc::new(MemoryStatCache::new())
        }
    };

    // --- Price sources ---
    let sources = configured_sources(&cfg)?;
    if cfg.mock_sources {
        warn!("VALUATOR_MOCK_SOURCES set: area prices come from static national figures");
    }
    let normalizer = AreaPriceNormalizer::new(
        sources,
        cache,
        Duration::from_secs(cfg.source_timeout_secs),
    );
    info!(
        "Area lookup: sources [{}] | timeout {}s | cache {} ({}-day TTL)",
        normalizer.source_ids().join(", "),
        cfg.source_timeout_secs,
        cfg.cache_backend,
        CACHE_TTL_DAYS,
    );

    // --- Listing extraction ---
    let extractor: Option<Arc<dyn ListingExtractor>> = match OpenAiExtractor::from_config(&cfg)? {
        Some(x) => {
            info!("Listing extraction enabled ({})", cfg.openai_model);
            Some(Arc::new(x))
        }
        None => {
            warn!("OPENAI_API_KEY not set: POST /analyze-content will answer 503");
            None
        }
    };

    // --- HTTP API ---
    let state = ApiState {
        valuator: Arc::new(Valuator::new(Arc::new(normalizer))),
        extractor,
    };
    let app = router(state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
