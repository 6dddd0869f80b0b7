//! Structuring: asks the model to coerce scraped page text into job records.
//!
//! The schema is enforced by the prompt, not by the host: every field is
//! optional and null-coalesced, and entries that still fail to deserialize are
//! dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::assistant::enrich::{truncate_chars, ScrapedPage};
use crate::assistant::prompts::{fill, STRUCTURE_PROMPT_TEMPLATE};
use crate::cache::keys::job_id;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{complete_json, ChatModel};

/// Page text sent to the model per listing in the combined prompt.
const MAX_CHARS_PER_PAGE: usize = 6000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum WorkMode {
    Remote,
    Hybrid,
    Onsite,
    #[default]
    Unknown,
}

impl WorkMode {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "remote" => WorkMode::Remote,
            "hybrid" => WorkMode::Hybrid,
            "onsite" | "on-site" | "on site" | "in office" => WorkMode::Onsite,
            _ => WorkMode::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for WorkMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label.as_deref().map(WorkMode::from_label).unwrap_or_default())
    }
}

/// A structured job listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub work_mode: WorkMode,
    #[serde(default)]
    pub experience_required: Option<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub skills_required: Vec<String>,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub salary_or_stipend: Option<String>,
    #[serde(default)]
    pub eligibility: Option<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub responsibilities: Vec<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

fn nullable_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// The structured result of one job search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredJobs {
    pub jobs: Vec<JobRecord>,
    pub fetched_at: DateTime<Utc>,
}

impl StructuredJobs {
    pub fn new(jobs: Vec<JobRecord>) -> Self {
        Self {
            jobs,
            fetched_at: Utc::now(),
        }
    }
}

/// A job record as shown in listings: content-hash id plus optional ranking note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobCard {
    pub id: String,
    #[serde(flatten)]
    pub job: JobRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_reason: Option<String>,
}

impl From<JobRecord> for JobCard {
    fn from(job: JobRecord) -> Self {
        Self {
            id: job_id(job.source_url.as_deref()),
            job,
            match_reason: None,
        }
    }
}

/// Extracts at most `limit` job records from `pages` with a single model call.
///
/// Returns an empty list when there are no pages or the model output is unusable.
pub async fn extract_jobs(pages: &[ScrapedPage], limit: usize, llm: &dyn ChatModel) -> Vec<JobRecord> {
    if pages.is_empty() {
        return Vec::new();
    }

    let prompt = build_structure_prompt(pages);
    let reply: Value = match complete_json(llm, &prompt, JSON_ONLY_SYSTEM).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Structured extraction failed, dropping {} pages: {e}", pages.len());
            return Vec::new();
        }
    };

    let jobs = coerce_jobs(reply, pages, limit);
    info!(
        "Structured {} jobs from {} pages (limit {limit})",
        jobs.len(),
        pages.len()
    );
    jobs
}

fn build_structure_prompt(pages: &[ScrapedPage]) -> String {
    let body = pages
        .iter()
        .enumerate()
        .map(|(i, page)| {
            format!(
                "PAGE {}\nURL: {}\nCONTENT:\n{}\n",
                i + 1,
                page.url,
                truncate_chars(&page.text, MAX_CHARS_PER_PAGE)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let page_count = pages.len().to_string();
    fill(
        STRUCTURE_PROMPT_TEMPLATE,
        &[("page_count", page_count.as_str()), ("pages", body.as_str())],
    )
}

/// Accepts `{"jobs": [...]}` or a bare array; drops malformed entries and fills
/// missing `source_url` from the page at the same position.
fn coerce_jobs(reply: Value, pages: &[ScrapedPage], limit: usize) -> Vec<JobRecord> {
    let items = match reply {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("jobs") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value::<JobRecord>(item) {
            Ok(mut job) => {
                if job.source_url.as_deref().map_or(true, |u| u.trim().is_empty()) {
                    job.source_url = pages.get(i).map(|p| p.url.clone());
                }
                Some(job)
            }
            Err(e) => {
                debug!("Dropping malformed job entry {i}: {e}");
                None
            }
        })
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::ScriptedModel;
    use serde_json::json;

    fn page(url: &str, text: &str) -> ScrapedPage {
        ScrapedPage {
            url: url.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_nulls_are_coalesced() {
        let job: JobRecord = serde_json::from_value(json!({
            "job_title": "Data Engineer",
            "work_mode": null,
            "skills_required": null,
            "responsibilities": ["Build pipelines"]
        }))
        .unwrap();
        assert_eq!(job.work_mode, WorkMode::Unknown);
        assert!(job.skills_required.is_empty());
        assert_eq!(job.responsibilities, vec!["Build pipelines"]);
        assert!(job.company.is_none());
    }

    #[test]
    fn test_unrecognised_work_mode_becomes_unknown() {
        let job: JobRecord = serde_json::from_value(json!({"work_mode": "Flexible"})).unwrap();
        assert_eq!(job.work_mode, WorkMode::Unknown);
        assert_eq!(WorkMode::from_label("On-site"), WorkMode::Onsite);
        assert_eq!(WorkMode::from_label("REMOTE"), WorkMode::Remote);
    }

    #[test]
    fn test_malformed_entries_are_dropped() {
        let pages = vec![page("https://a/1", "x"), page("https://a/2", "y")];
        let reply = json!({"jobs": [
            {"job_title": 42},
            {"job_title": "QA Engineer", "source_url": "https://a/2"}
        ]});
        let jobs = coerce_jobs(reply, &pages, 10);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].job_title.as_deref(), Some("QA Engineer"));
    }

    #[test]
    fn test_missing_source_url_is_filled_from_page() {
        let pages = vec![page("https://a/1", "x")];
        let jobs = coerce_jobs(json!([{"job_title": "SRE", "source_url": ""}]), &pages, 10);
        assert_eq!(jobs[0].source_url.as_deref(), Some("https://a/1"));
    }

    #[test]
    fn test_output_is_truncated_to_limit() {
        let reply = json!({"jobs": [{"job_title": "a"}, {"job_title": "b"}, {"job_title": "c"}]});
        assert_eq!(coerce_jobs(reply, &[], 2).len(), 2);
    }

    #[test]
    fn test_prompt_contains_every_page() {
        let prompt = build_structure_prompt(&[page("https://a/1", "first"), page("https://a/2", "second")]);
        assert!(prompt.contains("PAGE 1\nURL: https://a/1"));
        assert!(prompt.contains("PAGE 2\nURL: https://a/2"));
        assert!(prompt.contains("2 scraped job pages"));
    }

    #[test]
    fn test_job_card_flattens_record_and_hashes_url() {
        let card = JobCard::from(JobRecord {
            job_title: Some("ML Engineer".to_string()),
            source_url: Some("https://a/1".to_string()),
            ..Default::default()
        });
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["job_title"], json!("ML Engineer"));
        assert_eq!(json["id"], json!(job_id(Some("https://a/1"))));
        assert!(json.get("match_reason").is_none());
    }

    #[tokio::test]
    async fn test_no_pages_means_no_model_call() {
        let model = ScriptedModel::new();
        assert!(extract_jobs(&[], 5, &model).await.is_empty());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_model_output_yields_empty_list() {
        let model = ScriptedModel::new().reply("I could not find any jobs, sorry!");
        let jobs = extract_jobs(&[page("https://a/1", "text")], 5, &model).await;
        assert!(jobs.is_empty());
    }
}
