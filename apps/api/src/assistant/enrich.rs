//! Enrichment: turns listing URLs into page text.
//!
//! LinkedIn pages go through Tavily extract, everything else through Firecrawl.
//! One attempt per URL; failed, empty and expired pages are skipped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::assistant::discovery::SourceError;
use crate::assistant::sources::tavily::TavilyClient;

const FIRECRAWL_SCRAPE_URL: &str = "https://api.firecrawl.dev/v1/scrape";
/// How long Firecrawl waits for client-side rendering before capturing.
const FIRECRAWL_WAIT_MS: u64 = 10_000;
/// Page text kept per URL.
pub const MAX_PAGE_CHARS: usize = 9000;

const EXPIRED_PHRASES: &[&str] = &[
    "this job has expired",
    "job has expired",
    "no longer accepting applications",
    "job not found",
    "position closed",
    "this job is no longer available",
    "applications are closed",
];

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider error (status {status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Extraction returned no content for {0}")]
    NoContent(String),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// A scraped listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedPage {
    pub url: String,
    pub text: String,
}

/// Fetches the readable text of one page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, url: &str) -> Result<String, EnrichError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Providers
// ────────────────────────────────────────────────────────────────────────────

pub struct TavilyExtractFetcher {
    tavily: TavilyClient,
}

impl TavilyExtractFetcher {
    pub fn new(tavily: TavilyClient) -> Self {
        Self { tavily }
    }
}

#[async_trait]
impl PageFetcher for TavilyExtractFetcher {
    fn name(&self) -> &'static str {
        "tavily"
    }

    async fn fetch(&self, url: &str) -> Result<String, EnrichError> {
        let response = self.tavily.extract(url).await?;
        let mut results = response.results;
        let index = results.iter().position(|r| r.url == url).unwrap_or(0);
        if index >= results.len() {
            return Err(EnrichError::NoContent(url.to_string()));
        }
        Ok(results.swap_remove(index).into_text())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FirecrawlRequest<'a> {
    url: &'a str,
    formats: [&'a str; 1],
    wait_for: u64,
}

#[derive(Debug, Deserialize)]
struct FirecrawlResponse {
    #[serde(default)]
    data: Option<FirecrawlDocument>,
}

#[derive(Debug, Deserialize)]
struct FirecrawlDocument {
    #[serde(default)]
    markdown: Option<String>,
}

pub struct FirecrawlFetcher {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl FirecrawlFetcher {
    pub fn new(api_key: String) -> Result<Self, EnrichError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(90)).build()?,
            endpoint: FIRECRAWL_SCRAPE_URL.to_string(),
            api_key,
        })
    }

    #[cfg(test)]
    fn with_endpoint(self, endpoint: String) -> Self {
        Self { endpoint, ..self }
    }
}

#[async_trait]
impl PageFetcher for FirecrawlFetcher {
    fn name(&self) -> &'static str {
        "firecrawl"
    }

    async fn fetch(&self, url: &str) -> Result<String, EnrichError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&FirecrawlRequest {
                url,
                formats: ["markdown"],
                wait_for: FIRECRAWL_WAIT_MS,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EnrichError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let body: FirecrawlResponse = response.json().await?;
        Ok(body.data.and_then(|d| d.markdown).unwrap_or_default())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Enricher
// ────────────────────────────────────────────────────────────────────────────

/// Routes each URL to its provider and collects usable pages.
#[derive(Clone)]
pub struct Enricher {
    linkedin: Arc<dyn PageFetcher>,
    general: Arc<dyn PageFetcher>,
    /// Pause after each successful scrape by the general provider.
    scrape_pause: Duration,
}

impl Enricher {
    pub fn new(
        linkedin: Arc<dyn PageFetcher>,
        general: Arc<dyn PageFetcher>,
        scrape_pause: Duration,
    ) -> Self {
        Self {
            linkedin,
            general,
            scrape_pause,
        }
    }

    /// Visits `urls` in order until `limit` usable pages have been collected.
    pub async fn enrich(&self, urls: &[String], limit: usize) -> Vec<ScrapedPage> {
        let mut pages = Vec::new();

        for url in urls {
            if pages.len() >= limit {
                info!("Page limit {limit} reached");
                break;
            }

            let is_linkedin = url.contains("linkedin.com");
            let fetcher = if is_linkedin {
                &self.linkedin
            } else {
                &self.general
            };

            let text = match fetcher.fetch(url).await {
                Ok(text) => text,
                Err(e) => {
                    warn!("{} failed for {url}: {e}", fetcher.name());
                    continue;
                }
            };

            if !is_linkedin && !self.scrape_pause.is_zero() {
                tokio::time::sleep(self.scrape_pause).await;
            }

            if is_expired(&text) {
                info!("Listing expired or empty, skipping {url}");
                continue;
            }

            debug!("Scraped {} chars from {url}", text.len());
            pages.push(ScrapedPage {
                url: url.clone(),
                text: clean_page_text(&text, MAX_PAGE_CHARS),
            });
        }

        info!("Enriched {} of {} URLs", pages.len(), urls.len());
        pages
    }
}

/// Empty pages and pages with a closed-listing phrase count as expired.
pub fn is_expired(text: &str) -> bool {
    if text.trim().is_empty() {
        return true;
    }
    let lower = text.to_lowercase();
    EXPIRED_PHRASES.iter().any(|p| lower.contains(p))
}

/// Trims and truncates to at most `max_chars` characters.
pub fn clean_page_text(text: &str, max_chars: usize) -> String {
    truncate_chars(text.trim(), max_chars).to_string()
}

pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Canned fetcher for tests: answers from a URL → text table.
#[cfg(test)]
pub mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::{EnrichError, PageFetcher};

    #[derive(Default)]
    pub struct CannedFetcher {
        pub pages: HashMap<String, String>,
        pub calls: Mutex<Vec<String>>,
    }

    impl CannedFetcher {
        pub fn with(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(u, t)| (u.to_string(), t.to_string()))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for CannedFetcher {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn fetch(&self, url: &str) -> Result<String, EnrichError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| EnrichError::NoContent(url.to_string()))
        }
    }
}
