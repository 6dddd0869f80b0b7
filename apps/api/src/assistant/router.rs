//! Mode router. Decides whether a chat message is a job search or general conversation.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::assistant::prompts::ROUTE_PROMPT_TEMPLATE;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{complete_json, ChatModel};

/// Substrings that mark a message as a job search.
const JOB_KEYWORDS: &[&str] = &[
    "job",
    "jobs",
    "intern",
    "internship",
    "linkedin",
    "hiring",
    "opening",
    "role",
    "vacancy",
    "career",
    "resume",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Job,
    #[default]
    Normal,
}

/// How the router reaches a decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RouterStrategy {
    /// Fixed keyword list, no model call.
    #[default]
    Keyword,
    /// One model call, keyword list on failure.
    Llm,
}

impl FromStr for RouterStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyword" => Ok(RouterStrategy::Keyword),
            "llm" => Ok(RouterStrategy::Llm),
            other => Err(format!(
                "ROUTER_STRATEGY must be 'keyword' or 'llm', got '{other}'"
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RouteDecision {
    mode: Mode,
}

/// Deterministic keyword classification.
pub fn classify_by_keywords(user_input: &str) -> Mode {
    let msg = user_input.to_lowercase();
    if JOB_KEYWORDS.iter().any(|k| msg.contains(k)) {
        Mode::Job
    } else {
        Mode::Normal
    }
}

/// Classifies `user_input` with the configured strategy.
pub async fn classify(strategy: RouterStrategy, user_input: &str, llm: &dyn ChatModel) -> Mode {
    let mode = match strategy {
        RouterStrategy::Keyword => classify_by_keywords(user_input),
        RouterStrategy::Llm => {
            let prompt = ROUTE_PROMPT_TEMPLATE.replace("{user_input}", user_input);
            match complete_json::<RouteDecision>(llm, &prompt, JSON_ONLY_SYSTEM).await {
                Ok(decision) => decision.mode,
                Err(e) => {
                    warn!("Model routing failed, using keyword router: {e}");
                    classify_by_keywords(user_input)
                }
            }
        }
    };
    info!("Routed message to {:?} mode", mode);
    mode
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::ScriptedModel;

    #[test]
    fn test_job_request_routes_to_job_mode() {
        assert_eq!(classify_by_keywords("jobs in Telangana"), Mode::Job);
        assert_eq!(
            classify_by_keywords("Any INTERNSHIP openings at startups?"),
            Mode::Job
        );
    }

    #[test]
    fn test_small_talk_routes_to_normal_mode() {
        assert_eq!(classify_by_keywords("tell me a joke"), Mode::Normal);
        assert_eq!(classify_by_keywords("what is the capital of France"), Mode::Normal);
    }

    #[test]
    fn test_keyword_classification_is_deterministic() {
        let first = classify_by_keywords("hiring for rust developers");
        for _ in 0..10 {
            assert_eq!(classify_by_keywords("hiring for rust developers"), first);
        }
    }

    #[test]
    fn test_router_strategy_parses_case_insensitively() {
        assert_eq!("LLM".parse::<RouterStrategy>(), Ok(RouterStrategy::Llm));
        assert_eq!(" keyword ".parse::<RouterStrategy>(), Ok(RouterStrategy::Keyword));
        assert!("magic".parse::<RouterStrategy>().is_err());
    }

    #[test]
    fn test_mode_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Mode::Job).unwrap(), r#""job""#);
        let mode: Mode = serde_json::from_str(r#""normal""#).unwrap();
        assert_eq!(mode, Mode::Normal);
    }

    #[tokio::test]
    async fn test_keyword_strategy_never_calls_model() {
        let model = ScriptedModel::new();
        let mode = classify(RouterStrategy::Keyword, "tell me a joke", &model).await;
        assert_eq!(mode, Mode::Normal);
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_llm_strategy_uses_model_decision() {
        let model = ScriptedModel::new().reply(r#"{"mode": "job"}"#);
        let mode = classify(RouterStrategy::Llm, "I want to work on compilers", &model).await;
        assert_eq!(mode, Mode::Job);
    }

    #[tokio::test]
    async fn test_llm_strategy_falls_back_to_keywords_on_failure() {
        let model = ScriptedModel::new().fail(500);
        let mode = classify(RouterStrategy::Llm, "jobs in Pune", &model).await;
        assert_eq!(mode, Mode::Job);
    }
}
