//! Content-hash keys for the job caches and job card ids.

use sha2::{Digest, Sha256};

use crate::assistant::rank::CandidateProfile;

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Key for the search cache: hash of the trimmed, lower-cased query.
pub fn query_key(query: &str) -> String {
    sha256_hex(&normalize_query(query))
}

/// Key for the recommend cache: hash of the query and every profile field.
/// Skills are sorted so their order does not matter.
pub fn recommend_key(query: &str, profile: &CandidateProfile) -> String {
    let mut skills = profile.tech_skills.clone().unwrap_or_default();
    skills.sort();

    let parts = [
        normalize_query(query),
        profile.resume_text.clone().unwrap_or_default(),
        profile.user_name.clone().unwrap_or_default(),
        profile.user_age.map(|a| a.to_string()).unwrap_or_default(),
        skills.join(","),
        profile.experience.clone().unwrap_or_default(),
    ];
    sha256_hex(&parts.join("|"))
}

/// Job card id: hash of the listing URL, or of `unknown` when there is none.
pub fn job_id(source_url: Option<&str>) -> String {
    sha256_hex(source_url.unwrap_or("unknown"))
}
