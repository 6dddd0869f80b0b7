//! Job query parsing. Pulls keywords, location and a result limit out of a chat message.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::assistant::prompts::QUERY_PROMPT_TEMPLATE;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{complete_json, ChatModel};

pub const DEFAULT_JOB_LIMIT: u32 = 5;
pub const MAX_JOB_LIMIT: u32 = 12;
pub const DEFAULT_LOCATION: &str = "India";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobQuery {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub location: Vec<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_JOB_LIMIT
}

impl JobQuery {
    /// Query with no keywords or location; sources fill in their own defaults.
    pub fn default_for(limit: u32) -> Self {
        Self {
            keywords: Vec::new(),
            location: Vec::new(),
            limit: clamp_limit(limit),
        }
    }

    /// Keywords joined into one search phrase, or `fallback` when none were found.
    pub fn keywords_or(&self, fallback: &str) -> String {
        join_or(&self.keywords, fallback)
    }

    pub fn location_or_default(&self) -> String {
        join_or(&self.location, DEFAULT_LOCATION)
    }
}

fn join_or(parts: &[String], fallback: &str) -> String {
    let joined = parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        fallback.to_string()
    } else {
        joined
    }
}

pub fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(1, MAX_JOB_LIMIT)
}

/// Extracts a `JobQuery` from the user's message.
///
/// `limit_override` (from the request) wins over whatever the model parsed.
/// A failed model call degrades to an empty query rather than an error.
pub async fn parse_job_query(
    user_input: &str,
    limit_override: Option<u32>,
    llm: &dyn ChatModel,
) -> JobQuery {
    let prompt = QUERY_PROMPT_TEMPLATE.replace("{user_input}", user_input);
    let mut query = match complete_json::<JobQuery>(llm, &prompt, JSON_ONLY_SYSTEM).await {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Job query parsing failed, searching with defaults: {e}");
            JobQuery::default_for(DEFAULT_JOB_LIMIT)
        }
    };

    if let Some(limit) = limit_override {
        query.limit = limit;
    }
    query.limit = clamp_limit(query.limit);

    info!(
        "Job query: keywords={:?} location={:?} limit={}",
        query.keywords, query.location, query.limit
    );
    query
}
