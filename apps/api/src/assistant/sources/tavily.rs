//! Tavily web search / extract API client. Used for Indeed discovery and for
//! extracting LinkedIn pages.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::assistant::discovery::SourceError;

const TAVILY_API_URL: &str = "https://api.tavily.com";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    search_depth: &'a str,
    max_results: u32,
    include_answer: bool,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    urls: Vec<&'a str>,
    extract_depth: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ExtractResponse {
    #[serde(default)]
    pub results: Vec<ExtractResult>,
}

#[derive(Debug, Deserialize)]
pub struct ExtractResult {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub raw_content: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl ExtractResult {
    /// Prefers the raw page content over the summarized one.
    pub fn into_text(self) -> String {
        self.raw_content
            .filter(|c| !c.trim().is_empty())
            .or(self.content)
            .unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct TavilyClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TavilyClient {
    pub fn new(api_key: String) -> Result<Self, SourceError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(60)).build()?,
            base_url: TAVILY_API_URL.to_string(),
            api_key,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(self, base_url: String) -> Self {
        Self { base_url, ..self }
    }

    /// Advanced-depth web search without answers or raw content.
    pub async fn search(&self, query: &str, max_results: u32) -> Result<SearchResponse, SourceError> {
        let body = SearchRequest {
            query,
            search_depth: "advanced",
            max_results,
            include_answer: false,
            include_raw_content: false,
        };
        self.post("search", &body).await
    }

    /// Advanced-depth page extraction for a single URL.
    pub async fn extract(&self, url: &str) -> Result<ExtractResponse, SourceError> {
        let body = ExtractRequest {
            urls: vec![url],
            extract_depth: "advanced",
        };
        self.post("extract", &body).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, SourceError>
    where
        B: Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}
