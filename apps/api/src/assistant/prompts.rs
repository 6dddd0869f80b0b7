// All LLM prompt constants for the assistant pipeline.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Substitutes `{name}` placeholders in a single left-to-right pass.
///
/// Inserted values are never scanned again, so user text or scraped content
/// that happens to contain a placeholder stays literal. Braces that do not
/// name a known placeholder (JSON examples in the templates) are kept as is.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let hit = values
            .iter()
            .find(|(name, _)| tail.starts_with(name) && tail[name.len()..].starts_with('}'));
        match hit {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Mode classification. Replace `{user_input}` before sending.
pub const ROUTE_PROMPT_TEMPLATE: &str = r#"Classify the user message into ONE mode:
- "job": job / internship / hiring / openings / resume / job search intent
- "normal": everything else

Return a JSON object with this EXACT schema:
{"mode": "job"}

User message:
{user_input}"#;

/// Job query extraction. Replace `{user_input}` before sending.
pub const QUERY_PROMPT_TEMPLATE: &str = r#"Extract a job search query from the message.

Return a JSON object with this EXACT schema:
{
  "keywords": ["machine learning engineer"],
  "location": ["Telangana"],
  "limit": 5
}

Rules:
- keywords: roles, technologies or fields the user is searching for
- location: cities, states or countries mentioned; [] if none
- limit: number of jobs requested; 5 if not specified

Message:
{user_input}"#;

/// Structured extraction over all scraped pages.
/// Replace: {page_count}, {pages}
pub const STRUCTURE_PROMPT_TEMPLATE: &str = r#"You are an information extraction system.

Below are {page_count} scraped job pages. Extract one job per page.

Return a JSON object with this EXACT schema:
{
  "jobs": [
    {
      "job_title": "Machine Learning Engineer",
      "company": "Acme",
      "location": "Hyderabad, Telangana",
      "work_mode": "Hybrid",
      "experience_required": "2+ years",
      "skills_required": ["Python", "PyTorch"],
      "education": "B.Tech in CS or related",
      "salary_or_stipend": null,
      "eligibility": null,
      "responsibilities": ["Train and evaluate models"],
      "requirements": ["Experience with MLOps"],
      "job_description": "Short paraphrase of the description",
      "summary": "One or two line summary",
      "source_url": "the PAGE URL given above the page"
    }
  ]
}

Rules:
- If a value is missing use null (or [] for lists)
- work_mode must be one of: Remote, Hybrid, Onsite, Unknown
- source_url must be the URL of the page the job came from
- Keep the jobs in the same order as the pages

{pages}"#;

/// Job ranking against a candidate profile.
/// Replace: {profile}, {jobs_json}
pub const RANK_PROMPT_TEMPLATE: &str = r#"You are an expert HR recruiter.
You will receive a CANDIDATE PROFILE and a list of JOBS.
The profile contains specific details (name, age, skills, experience) and/or a resume.

TASK:
1. Analyze the technical skills and experience in the profile.
2. Rank the JOBS from best to worst match for the stated skills and experience.
3. Give each job a one-line "match_reason" that explicitly names the candidate's
   matching skills or experience (e.g. "Matches your Python and React skills").

CANDIDATE PROFILE:
{profile}

JOBS:
{jobs_json}

Return a JSON ARRAY ordered best match first:
[{"id": "the job id from above", "match_reason": "..."}]"#;

/// System prompt for the final recommendation.
pub const ANSWER_SYSTEM: &str = "You are an agentic job assistant. \
    Present job search results in a professional, easy to read way using markdown.";

/// Final recommendation. Replace: {instruction}, {user_input}, {jobs_json}
pub const ANSWER_PROMPT_TEMPLATE: &str = r#"{instruction}

USER REQUEST:
{user_input}

Extracted structured jobs (JSON):
{jobs_json}

TASK:
1) Give a quick list of jobs (Title | Company | Location | Apply URL)
2) Give a short summary for each job (2-3 lines)
3) Recommend the best job for the user request and explain why
4) Suggest next steps: what to prepare, how to apply, resume tips"#;

/// System prompt for general conversation.
pub const CHAT_SYSTEM: &str = "You are a friendly career assistant. \
    Answer the user's message helpfully and concisely.";
