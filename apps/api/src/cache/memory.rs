//! Bounded in-memory job cache with a time-to-live.
//!
//! When full, the oldest inserted entry is evicted. Expired entries are
//! dropped when they are next read.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use crate::assistant::structure::JobCard;
use crate::cache::{CacheError, CacheSpace, JobCache};

struct Entry {
    inserted_at: Instant,
    jobs: Vec<JobCard>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    order: VecDeque<String>,
}

pub struct MemoryCache {
    inner: Mutex<Inner>,
    max_entries: usize,
    ttl: Duration,
}

impl MemoryCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_entries: max_entries.max(1),
            ttl,
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // a poisoned cache is still a valid cache
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl JobCache for MemoryCache {
    async fn get(&self, space: CacheSpace, key: &str) -> Result<Option<Vec<JobCard>>, CacheError> {
        let scoped = space.scoped(key);
        let mut inner = self.lock();

        let expired = match inner.entries.get(&scoped) {
            None => return Ok(None),
            Some(entry) => entry.inserted_at.elapsed() >= self.ttl,
        };

        if expired {
            debug!("Cache entry expired: {scoped}");
            inner.entries.remove(&scoped);
            inner.order.retain(|k| k != &scoped);
            return Ok(None);
        }

        Ok(inner.entries.get(&scoped).map(|e| e.jobs.clone()))
    }

    async fn put(&self, space: CacheSpace, key: &str, jobs: &[JobCard]) -> Result<(), CacheError> {
        let scoped = space.scoped(key);
        let mut inner = self.lock();

        if inner.entries.contains_key(&scoped) {
            inner.order.retain(|k| k != &scoped);
        } else {
            while inner.entries.len() >= self.max_entries {
                let Some(oldest) = inner.order.pop_front() else { break };
                debug!("Evicting cache entry: {oldest}");
                inner.entries.remove(&oldest);
            }
        }

        inner.order.push_back(scoped.clone());
        inner.entries.insert(
            scoped,
            Entry {
                inserted_at: Instant::now(),
                jobs: jobs.to_vec(),
            },
        );
        Ok(())
    }
}
