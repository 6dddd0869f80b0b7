use std::sync::Arc;

use crate::assistant::pipeline::Assistant;
use crate::cache::JobCache;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub assistant: Assistant,
    /// Search and recommend caches. In-memory unless `REDIS_URL` is set.
    pub cache: Arc<dyn JobCache>,
    pub config: Config,
}
