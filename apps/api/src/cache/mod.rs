//! Job caches: search results per query and ranked results per profile.
//!
//! Both live behind `JobCache`, carried in `AppState` as `Arc<dyn JobCache>`.
//! Default backend is the bounded in-memory store; Redis is used when
//! `REDIS_URL` is configured.

use async_trait::async_trait;
use thiserror::Error;

use crate::assistant::structure::JobCard;

pub mod keys;
pub mod memory;
pub mod redis_store;

pub use memory::MemoryCache;
pub use redis_store::RedisCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Which of the two caches an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheSpace {
    /// Query key → jobs in discovery order.
    Search,
    /// Query + profile key → jobs in ranked order.
    Recommend,
}

impl CacheSpace {
    pub fn prefix(self) -> &'static str {
        match self {
            CacheSpace::Search => "search",
            CacheSpace::Recommend => "recommend",
        }
    }

    pub fn scoped(self, key: &str) -> String {
        format!("jobpilot:{}:{key}", self.prefix())
    }
}

#[async_trait]
pub trait JobCache: Send + Sync {
    async fn get(&self, space: CacheSpace, key: &str) -> Result<Option<Vec<JobCard>>, CacheError>;

    async fn put(&self, space: CacheSpace, key: &str, jobs: &[JobCard]) -> Result<(), CacheError>;
}
