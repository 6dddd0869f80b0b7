//! Ranking: reorders job cards against a candidate profile with one model call.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::assistant::prompts::{fill, RANK_PROMPT_TEMPLATE};
use crate::assistant::structure::JobCard;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{complete_json, ChatModel};

const DEFAULT_MATCH_REASON: &str = "Matches profile.";
const UNRANKED_MATCH_REASON: &str = "Standard match.";

/// Free-text candidate details used for personalized ranking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    #[serde(default)]
    pub resume_text: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub user_age: Option<u32>,
    #[serde(default)]
    pub tech_skills: Option<Vec<String>>,
    #[serde(default)]
    pub experience: Option<String>,
}

impl CandidateProfile {
    /// Renders the profile as prompt text; empty when nothing was provided.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(name) = non_blank(&self.user_name) {
            out.push_str(&format!("Candidate Name: {name}\n"));
        }
        if let Some(age) = self.user_age {
            out.push_str(&format!("Age: {age}\n"));
        }
        if let Some(skills) = self.tech_skills.as_ref().filter(|s| !s.is_empty()) {
            out.push_str(&format!("Technical Skills: {}\n", skills.join(", ")));
        }
        if let Some(experience) = non_blank(&self.experience) {
            out.push_str(&format!("Experience Summary: {experience}\n"));
        }
        if let Some(resume) = non_blank(&self.resume_text) {
            out.push_str(&format!("\n--- RESUME CONTENT ---\n{resume}\n"));
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.render().trim().is_empty()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Deserialize)]
struct RankedEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    match_reason: Option<String>,
}

/// Reorders `jobs` for `profile`.
///
/// Jobs come back in the model's order; jobs the model left out follow in their
/// original order with a placeholder reason. An empty profile or a failed model
/// call leaves the order unchanged.
pub async fn rank_jobs(
    jobs: Vec<JobCard>,
    profile: &CandidateProfile,
    llm: &dyn ChatModel,
) -> Vec<JobCard> {
    if jobs.is_empty() || profile.is_empty() {
        return jobs;
    }

    let jobs_input: Vec<_> = jobs
        .iter()
        .map(|j| {
            json!({
                "id": j.id,
                "job_title": j.job.job_title,
                "company": j.job.company,
                "skills_required": j.job.skills_required,
                "summary": j.job.summary,
            })
        })
        .collect();

    let profile_text = profile.render();
    let jobs_json = serde_json::Value::Array(jobs_input).to_string();
    let prompt = fill(
        RANK_PROMPT_TEMPLATE,
        &[("profile", profile_text.as_str()), ("jobs_json", jobs_json.as_str())],
    );

    match complete_json::<Vec<RankedEntry>>(llm, &prompt, JSON_ONLY_SYSTEM).await {
        Ok(ranked) => {
            let ordered = apply_ranking(jobs, ranked);
            info!("Ranked {} jobs against candidate profile", ordered.len());
            ordered
        }
        Err(e) => {
            warn!("Ranking failed, keeping original order: {e}");
            jobs
        }
    }
}

fn apply_ranking(jobs: Vec<JobCard>, ranked: Vec<RankedEntry>) -> Vec<JobCard> {
    let mut by_id: HashMap<String, JobCard> = HashMap::new();
    let mut original_order = Vec::with_capacity(jobs.len());
    for job in jobs {
        original_order.push(job.id.clone());
        by_id.entry(job.id.clone()).or_insert(job);
    }

    let mut placed = HashSet::new();
    let mut ordered = Vec::with_capacity(original_order.len());

    for entry in ranked {
        let Some(id) = entry.id else { continue };
        if !placed.insert(id.clone()) {
            continue;
        }
        if let Some(mut job) = by_id.remove(&id) {
            job.match_reason = Some(
                entry
                    .match_reason
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_MATCH_REASON.to_string()),
            );
            ordered.push(job);
        }
    }

    for id in original_order {
        if let Some(mut job) = by_id.remove(&id) {
            job.match_reason = Some(UNRANKED_MATCH_REASON.to_string());
            ordered.push(job);
        }
    }

    ordered
}
