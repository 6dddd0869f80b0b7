// Shared prompt constants.
// Each pipeline step keeps its own prompts next to it in assistant/prompts.rs.
// This file contains cross-cutting prompt fragments.

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction appended to every prompt that shows job data to the model.
pub const NO_INVENTION_INSTRUCTION: &str = "\
    CRITICAL: Use ONLY the job data provided. Do NOT invent titles, companies, \
    salaries or links. If a field is missing, leave it out.";
