//! Assistant pipeline. Orchestrates one chat turn.
//!
//! Flow: route → (normal) chat reply
//!             → (job)    parse query → discover (2 sources, concurrent) →
//!                        enrich → structure → recommend
//!
//! Every external step degrades to an empty result on failure; a turn always
//! produces an answer.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::assistant::answer::{chat_reply, recommend};
use crate::assistant::discovery::{discover_urls, JobSource};
use crate::assistant::enrich::Enricher;
use crate::assistant::query::parse_job_query;
use crate::assistant::router::{classify, Mode, RouterStrategy};
use crate::assistant::structure::{extract_jobs, JobCard, JobRecord, StructuredJobs};
use crate::llm_client::ChatModel;

/// One user turn.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatInput {
    pub query: String,
    /// `job` forces the job flow; anything else lets the router decide.
    #[serde(default, deserialize_with = "requested_mode")]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Accepts any string for `mode`; only `job` and `normal` are recognised.
fn requested_mode<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Mode>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(match raw.as_deref().map(str::trim) {
        Some(m) if m.eq_ignore_ascii_case("job") => Some(Mode::Job),
        Some(m) if m.eq_ignore_ascii_case("normal") => Some(Mode::Normal),
        _ => None,
    })
}

/// Result of one turn.
#[derive(Debug, Clone, Serialize)]
pub struct AssistantOutcome {
    pub mode: Mode,
    pub final_answer: String,
    pub structured_data: Option<StructuredJobs>,
    pub job_urls: Vec<String>,
}

struct SearchResult {
    urls: Vec<String>,
    jobs: Vec<JobRecord>,
}

#[derive(Clone)]
pub struct Assistant {
    /// Low-temperature model for routing, query parsing, extraction and ranking.
    precise: Arc<dyn ChatModel>,
    /// Model that writes user-facing prose.
    writer: Arc<dyn ChatModel>,
    linkedin: Arc<dyn JobSource>,
    indeed: Arc<dyn JobSource>,
    enricher: Enricher,
    router: RouterStrategy,
}

impl Assistant {
    pub fn new(
        precise: Arc<dyn ChatModel>,
        writer: Arc<dyn ChatModel>,
        linkedin: Arc<dyn JobSource>,
        indeed: Arc<dyn JobSource>,
        enricher: Enricher,
        router: RouterStrategy,
    ) -> Self {
        Self {
            precise,
            writer,
            linkedin,
            indeed,
            enricher,
            router,
        }
    }

    pub fn ranking_model(&self) -> &dyn ChatModel {
        self.precise.as_ref()
    }

    /// Runs one chat turn end to end.
    pub async fn run(&self, input: &ChatInput) -> AssistantOutcome {
        let mode = match input.mode {
            Some(Mode::Job) => Mode::Job,
            _ => classify(self.router, &input.query, self.precise.as_ref()).await,
        };

        match mode {
            Mode::Normal => AssistantOutcome {
                mode,
                final_answer: chat_reply(&input.query, self.writer.as_ref()).await,
                structured_data: None,
                job_urls: Vec::new(),
            },
            Mode::Job => {
                let found = self.search(&input.query, input.limit).await;
                let final_answer = recommend(&input.query, &found.jobs, self.writer.as_ref()).await;
                AssistantOutcome {
                    mode,
                    final_answer,
                    structured_data: Some(StructuredJobs::new(found.jobs)),
                    job_urls: found.urls,
                }
            }
        }
    }

    /// Job search without answer composition, as cards deduplicated by id.
    pub async fn find_jobs(&self, query: &str, limit: u32) -> Vec<JobCard> {
        let found = self.search(query, Some(limit)).await;

        let mut seen = HashSet::new();
        let cards: Vec<JobCard> = found
            .jobs
            .into_iter()
            .map(JobCard::from)
            .filter(|card| seen.insert(card.id.clone()))
            .collect();

        info!("Found {} job cards for '{query}'", cards.len());
        cards
    }

    async fn search(&self, user_input: &str, limit: Option<u32>) -> SearchResult {
        let query = parse_job_query(user_input, limit, self.precise.as_ref()).await;
        let urls = discover_urls(self.linkedin.as_ref(), self.indeed.as_ref(), &query).await;
        let pages = self.enricher.enrich(&urls, query.limit as usize).await;
        let jobs = extract_jobs(&pages, query.limit as usize, self.precise.as_ref()).await;
        SearchResult { urls, jobs }
    }
}
