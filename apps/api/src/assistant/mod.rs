// Job-search assistant pipeline.
// route → query → discovery → enrichment → structuring → (ranking) → answer.
// All model calls go through llm_client; external web APIs live in sources/ and enrich.

pub mod answer;
pub mod discovery;
pub mod enrich;
pub mod pipeline;
pub mod prompts;
pub mod query;
pub mod rank;
pub mod router;
pub mod sources;
pub mod structure;
