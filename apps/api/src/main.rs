mod assistant;
mod cache;
mod chat;
mod config;
mod errors;
mod jobs;
mod llm_client;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::assistant::enrich::{Enricher, FirecrawlFetcher, TavilyExtractFetcher};
use crate::assistant::pipeline::Assistant;
use crate::assistant::sources::indeed::IndeedSearchSource;
use crate::assistant::sources::linkedin::LinkedInToolSource;
use crate::assistant::sources::tavily::TavilyClient;
use crate::cache::{JobCache, MemoryCache, RedisCache};
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

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

    info!("Starting JobPilot API v{}", env!("CARGO_PKG_VERSION"));

    // Model handles: deterministic for parsing and ranking, warmer for prose
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    let precise = Arc::new(llm.with_temperature(0.0));
    let writer = Arc::new(llm.with_temperature(0.3));
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Discovery sources
    let tavily = TavilyClient::new(config.tavily_api_key.clone())?;
    let linkedin = Arc::new(LinkedInToolSource::new(config.job_tool_url.clone())?);
    let indeed = Arc::new(IndeedSearchSource::new(tavily.clone()));
    info!("Job sources initialized (tool server: {})", config.job_tool_url);

    // Page enrichment
    let enricher = Enricher::new(
        Arc::new(TavilyExtractFetcher::new(tavily)),
        Arc::new(FirecrawlFetcher::new(config.firecrawl_api_key.clone())?),
        Duration::from_millis(config.scrape_pause_ms),
    );

    let assistant = Assistant::new(
        precise,
        writer,
        linkedin,
        indeed,
        enricher,
        config.router_strategy,
    );
    info!("Assistant ready (router: {:?})", config.router_strategy);

    let cache = build_cache(&config)?;

    // Build app state
    let state = AppState {
        assistant,
        cache,
        config: config.clone(),
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

/// Redis when `REDIS_URL` is set, otherwise the bounded in-memory store.
fn build_cache(config: &Config) -> Result<Arc<dyn JobCache>> {
    let ttl = Duration::from_secs(config.cache_ttl_secs);

    match &config.redis_url {
        Some(url) => Ok(Arc::new(RedisCache::new(url, ttl)?)),
        None => {
            info!(
                "In-memory job cache ({} entries, ttl {}s)",
                config.cache_max_entries, config.cache_ttl_secs
            );
            Ok(Arc::new(MemoryCache::new(config.cache_max_entries, ttl)))
        }
    }
}
