//! Answer composition for both chat modes.

use tracing::warn;

use crate::assistant::prompts::{fill, ANSWER_PROMPT_TEMPLATE, ANSWER_SYSTEM, CHAT_SYSTEM};
use crate::assistant::structure::JobRecord;
use crate::llm_client::prompts::NO_INVENTION_INSTRUCTION;
use crate::llm_client::ChatModel;

pub const NO_JOBS_ANSWER: &str =
    "I couldn't find any jobs for your query. Try changing keywords or location.";

const CHAT_UNAVAILABLE_ANSWER: &str =
    "Sorry, I couldn't come up with an answer right now. Please try again in a moment.";

/// General conversation: the raw user message goes to the model as is.
pub async fn chat_reply(user_input: &str, llm: &dyn ChatModel) -> String {
    match llm.complete(user_input, CHAT_SYSTEM).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Chat reply failed: {e}");
            CHAT_UNAVAILABLE_ANSWER.to_string()
        }
    }
}

/// Composes the recommendation for a job search.
pub async fn recommend(user_input: &str, jobs: &[JobRecord], llm: &dyn ChatModel) -> String {
    if jobs.is_empty() {
        return NO_JOBS_ANSWER.to_string();
    }

    let jobs_json = serde_json::to_string_pretty(jobs).unwrap_or_else(|_| "[]".to_string());
    let prompt = fill(
        ANSWER_PROMPT_TEMPLATE,
        &[
            ("instruction", NO_INVENTION_INSTRUCTION),
            ("user_input", user_input),
            ("jobs_json", jobs_json.as_str()),
        ],
    );

    match llm.complete(&prompt, ANSWER_SYSTEM).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Recommendation failed, returning plain job list: {e}");
            plain_job_list(jobs)
        }
    }
}

/// Markdown list of the jobs without any model involvement.
fn plain_job_list(jobs: &[JobRecord]) -> String {
    let mut out = String::from("Here are the jobs I found:\n");
    for (i, job) in jobs.iter().enumerate() {
        let title = job.job_title.as_deref().unwrap_or("Untitled role");
        let company = job.company.as_deref().unwrap_or("Unknown company");
        out.push_str(&format!("\n{}. {title} at {company}", i + 1));
        if let Some(location) = job.location.as_deref() {
            out.push_str(&format!(" ({location})"));
        }
        if let Some(url) = job.source_url.as_deref() {
            out.push_str(&format!("\n   Apply: {url}"));
        }
    }
    out
}
