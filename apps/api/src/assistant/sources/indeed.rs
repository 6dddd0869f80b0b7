//! Indeed discovery through a site-restricted web search.

use async_trait::async_trait;
use tracing::info;

use crate::assistant::discovery::{dedup_preserving_order, JobSource, SourceError};
use crate::assistant::query::JobQuery;
use crate::assistant::sources::tavily::TavilyClient;

const DEFAULT_KEYWORDS: &str = "internship";

pub struct IndeedSearchSource {
    tavily: TavilyClient,
}

impl IndeedSearchSource {
    pub fn new(tavily: TavilyClient) -> Self {
        Self { tavily }
    }
}

/// `site:in.indeed.com/viewjob "<keywords>" "<location>"`
pub fn indeed_search_query(keywords: &str, location: &str) -> String {
    format!(r#"site:in.indeed.com/viewjob "{keywords}" "{location}""#)
}

/// Keeps Indeed links only, deduplicated.
pub fn filter_indeed_urls(urls: impl IntoIterator<Item = String>) -> Vec<String> {
    dedup_preserving_order(urls.into_iter().filter(|u| u.contains("indeed.com")).collect())
}

#[async_trait]
impl JobSource for IndeedSearchSource {
    fn name(&self) -> &'static str {
        "indeed"
    }

    async fn discover(&self, query: &JobQuery, share: u32) -> Result<Vec<String>, SourceError> {
        let search = indeed_search_query(
            &query.keywords_or(DEFAULT_KEYWORDS),
            &query.location_or_default(),
        );
        info!("Indeed search: {search} (max {share})");

        let response = self.tavily.search(&search, share).await?;
        let urls = filter_indeed_urls(response.results.into_iter().map(|r| r.url));

        info!("Indeed returned {} job URLs", urls.len());
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::assistant::sources::tavily::testing::fake_tavily;

    #[test]
    fn test_search_query_is_site_restricted_and_quoted() {
        assert_eq!(
            indeed_search_query("data analyst", "Pune"),
            r#"site:in.indeed.com/viewjob "data analyst" "Pune""#
        );
    }

    #[test]
    fn test_non_indeed_urls_are_dropped() {
        let urls = vec![
            "https://in.indeed.com/viewjob?jk=1".to_string(),
            "https://example.com/careers".to_string(),
            "https://in.indeed.com/viewjob?jk=1".to_string(),
            "https://www.indeed.com/viewjob?jk=2".to_string(),
        ];
        assert_eq!(
            filter_indeed_urls(urls),
            vec![
                "https://in.indeed.com/viewjob?jk=1",
                "https://www.indeed.com/viewjob?jk=2"
            ]
        );
    }

    #[tokio::test]
    async fn test_discover_searches_indeed_with_share_as_max_results() {
        let (tavily, fake) = fake_tavily(&[(
            "search",
            200,
            json!({"results": [
                {"url": "https://in.indeed.com/viewjob?jk=1"},
                {"url": "https://www.naukri.com/job/2"},
                {"url": "https://in.indeed.com/viewjob?jk=3"}
            ]}),
        )])
        .await;
        let query = JobQuery {
            keywords: vec!["rust".to_string(), "developer".to_string()],
            location: vec!["Pune".to_string()],
            limit: 5,
        };

        let urls = IndeedSearchSource::new(tavily).discover(&query, 2).await.unwrap();

        assert_eq!(
            urls,
            vec!["https://in.indeed.com/viewjob?jk=1", "https://in.indeed.com/viewjob?jk=3"]
        );
        let requests = fake.requests.lock().unwrap();
        assert_eq!(
            requests[0].2["query"],
            r#"site:in.indeed.com/viewjob "rust developer" "Pune""#
        );
        assert_eq!(requests[0].2["max_results"], 2);
    }
}
