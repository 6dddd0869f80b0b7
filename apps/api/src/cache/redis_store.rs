//! Redis-backed job cache. Entries are JSON arrays written with `SET ... EX`.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tracing::info;

use crate::assistant::structure::JobCard;
use crate::cache::{CacheError, CacheSpace, JobCache};

pub struct RedisCache {
    client: redis::Client,
    ttl: Duration,
}

impl RedisCache {
    pub fn new(redis_url: &str, ttl: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        info!("Redis job cache configured (ttl {}s)", ttl.as_secs());
        Ok(Self { client, ttl })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl JobCache for RedisCache {
    async fn get(&self, space: CacheSpace, key: &str) -> Result<Option<Vec<JobCard>>, CacheError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(space.scoped(key))
            .query_async(&mut conn)
            .await?;

        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(CacheError::from)
    }

    async fn put(&self, space: CacheSpace, key: &str, jobs: &[JobCard]) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let json = serde_json::to_string(jobs)?;
        redis::cmd("SET")
            .arg(space.scoped(key))
            .arg(json)
            .arg("EX")
            .arg(self.ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}
