use anyhow::{Context, Result};

use crate::assistant::router::RouterStrategy;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub tavily_api_key: String,
    pub firecrawl_api_key: String,
    /// Streamable-HTTP endpoint of the LinkedIn job tool server.
    pub job_tool_url: String,
    pub redis_url: Option<String>,
    pub router_strategy: RouterStrategy,
    pub cache_max_entries: usize,
    pub cache_ttl_secs: u64,
    pub scrape_pause_ms: u64,
    pub stream_heartbeat_ms: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let router_strategy = optional_env("ROUTER_STRATEGY")
            .map(|s| s.parse::<RouterStrategy>())
            .transpose()
            .map_err(anyhow::Error::msg)?
            .unwrap_or_default();

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            tavily_api_key: require_env("TAVILY_API_KEY")?,
            firecrawl_api_key: require_env("FIRECRAWL_API_KEY")?,
            job_tool_url: optional_env("JOB_TOOL_URL")
                .unwrap_or_else(|| "http://127.0.0.1:8080/mcp".to_string()),
            redis_url: optional_env("REDIS_URL"),
            router_strategy,
            cache_max_entries: parse_env("CACHE_MAX_ENTRIES", 256)?,
            cache_ttl_secs: parse_env("CACHE_TTL_SECS", 3600)?,
            scrape_pause_ms: parse_env("SCRAPE_PAUSE_MS", 3000)?,
            stream_heartbeat_ms: parse_env("STREAM_HEARTBEAT_MS", 1000)?,
            port: parse_env("PORT", 4000)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Config with dummy keys and a fast stream heartbeat.
    pub fn for_tests() -> Self {
        Config {
            anthropic_api_key: "test-key".to_string(),
            tavily_api_key: "test-key".to_string(),
            firecrawl_api_key: "test-key".to_string(),
            job_tool_url: "http://127.0.0.1:8080/mcp".to_string(),
            redis_url: None,
            router_strategy: RouterStrategy::Keyword,
            cache_max_entries: 16,
            cache_ttl_secs: 60,
            scrape_pause_ms: 0,
            stream_heartbeat_ms: 10,
            port: 4000,
            rust_log: "info".to_string(),
        }
    }
}
