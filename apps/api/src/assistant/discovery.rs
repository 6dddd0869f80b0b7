//! Discovery: turns a job query into candidate listing URLs.
//!
//! Two sources are queried concurrently. A failing source contributes an empty
//! list and never cancels its sibling. Results are interleaved element by
//! element and deduplicated by first occurrence.

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::assistant::query::JobQuery;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// A job-listing source that can answer a query with listing URLs.
#[async_trait]
pub trait JobSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns at most `share` listing URLs for `query`.
    async fn discover(&self, query: &JobQuery, share: u32) -> Result<Vec<String>, SourceError>;
}

/// Splits `limit` between the two sources: the primary gets the ceiling half.
pub fn split_limit(limit: u32) -> (u32, u32) {
    let primary = limit.div_ceil(2);
    (primary, limit - primary)
}

/// Queries both sources concurrently and merges their URLs.
pub async fn discover_urls(
    primary: &dyn JobSource,
    secondary: &dyn JobSource,
    query: &JobQuery,
) -> Vec<String> {
    let (primary_share, secondary_share) = split_limit(query.limit);

    let (primary_urls, secondary_urls) = tokio::join!(
        run_source(primary, query, primary_share),
        run_source(secondary, query, secondary_share),
    );

    let merged = interleave_dedup(&primary_urls, &secondary_urls);
    info!(
        "Discovered {} unique URLs ({} from {}, {} from {})",
        merged.len(),
        primary_urls.len(),
        primary.name(),
        secondary_urls.len(),
        secondary.name()
    );
    merged
}

async fn run_source(source: &dyn JobSource, query: &JobQuery, share: u32) -> Vec<String> {
    if share == 0 {
        return Vec::new();
    }
    match source.discover(query, share).await {
        Ok(urls) => urls,
        Err(e) => {
            warn!("{} search failed: {e}", source.name());
            Vec::new()
        }
    }
}

/// Interleaves `[a1, b1, a2, b2, ...]` and keeps the first occurrence of each URL.
pub fn interleave_dedup(a: &[String], b: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(a.len() + b.len());

    for i in 0..a.len().max(b.len()) {
        for url in [a.get(i), b.get(i)].into_iter().flatten() {
            if seen.insert(url.as_str()) {
                merged.push(url.clone());
            }
        }
    }
    merged
}

/// Removes repeated URLs, keeping the first occurrence.
pub fn dedup_preserving_order(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|u| seen.insert(u.clone()))
        .collect()
}
