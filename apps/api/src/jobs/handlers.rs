//! Axum route handlers for the paginated job endpoints.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assistant::rank::{rank_jobs, CandidateProfile};
use crate::assistant::structure::JobCard;
use crate::cache::keys::{query_key, recommend_key};
use crate::cache::CacheSpace;
use crate::errors::AppError;
use crate::jobs::pagination::{paginate, PageRequest};
use crate::jobs::resume::read_upload;
use crate::state::AppState;

/// Jobs fetched per query before pagination.
const SEARCH_FETCH_LIMIT: u32 = 12;
const INITIAL_QUERY: &str = "Software Engineer";
const INITIAL_LIMIT: usize = 4;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(flatten)]
    pub page: PageRequest,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecommendRequest {
    pub query: String,
    #[serde(flatten)]
    pub page: PageRequest,
    #[serde(flatten)]
    pub profile: CandidateProfile,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub jobs: Vec<JobCard>,
    pub page: usize,
    pub page_size: usize,
    pub has_more: bool,
}

impl SearchResponse {
    fn paginated(all: &[JobCard], request: PageRequest) -> Self {
        let (jobs, has_more) = paginate(all, request);
        Self {
            jobs,
            page: request.page,
            page_size: request.page_size,
            has_more,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /jobs/search
///
/// Pages through the jobs found for `query`. The full result list is fetched
/// once and served from the search cache afterwards.
pub async fn handle_search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    validate_query(&request.query)?;
    request.page.validate()?;
    info!("Job search: query='{}' page={}", request.query, request.page.page);

    let all = cached_search(&state, &request.query, SEARCH_FETCH_LIMIT).await?;
    Ok(Json(SearchResponse::paginated(&all, request.page)))
}

/// POST /jobs/recommend-with-resume
///
/// Like search, but the jobs are ranked against the candidate profile.
pub async fn handle_recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    recommend(&state, request).await.map(Json)
}

/// POST /jobs/recommend-with-resume/upload
///
/// Multipart variant: the profile's resume text comes from an uploaded PDF.
pub async fn handle_recommend_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SearchResponse>, AppError> {
    let request = read_upload(multipart).await?;
    recommend(&state, request).await.map(Json)
}

/// GET /jobs/initial
///
/// First few jobs for a default query, shown before the user asks anything.
pub async fn handle_initial(State(state): State<AppState>) -> Result<Json<SearchResponse>, AppError> {
    let all = cached_search(&state, INITIAL_QUERY, INITIAL_LIMIT as u32).await?;

    Ok(Json(SearchResponse {
        jobs: all.iter().take(INITIAL_LIMIT).cloned().collect(),
        page: 1,
        page_size: INITIAL_LIMIT,
        has_more: all.len() > INITIAL_LIMIT,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn validate_query(query: &str) -> Result<(), AppError> {
    if query.trim().is_empty() {
        return Err(AppError::Validation("query cannot be empty".to_string()));
    }
    Ok(())
}

async fn recommend(state: &AppState, request: RecommendRequest) -> Result<SearchResponse, AppError> {
    validate_query(&request.query)?;
    request.page.validate()?;
    info!("Job recommendation: query='{}' page={}", request.query, request.page.page);

    let key = recommend_key(&request.query, &request.profile);
    let ranked = match state.cache.get(CacheSpace::Recommend, &key).await? {
        Some(hit) => hit,
        None => {
            let base = cached_search(state, &request.query, SEARCH_FETCH_LIMIT).await?;
            let ranked = rank_jobs(base, &request.profile, state.assistant.ranking_model()).await;
            if !ranked.is_empty() {
                state.cache.put(CacheSpace::Recommend, &key, &ranked).await?;
            }
            ranked
        }
    };

    Ok(SearchResponse::paginated(&ranked, request.page))
}

/// Full result list for `query`, from the search cache or a fresh run.
/// Empty results are not cached so the next request retries.
async fn cached_search(state: &AppState, query: &str, limit: u32) -> Result<Vec<JobCard>, AppError> {
    let key = query_key(query);
    if let Some(hit) = state.cache.get(CacheSpace::Search, &key).await? {
        return Ok(hit);
    }

    info!("Search cache miss for '{query}', running job search");
    let jobs = state.assistant.find_jobs(query, limit).await;
    if !jobs.is_empty() {
        state.cache.put(CacheSpace::Search, &key, &jobs).await?;
    }
    Ok(jobs)
}
