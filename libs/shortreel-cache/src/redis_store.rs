//! Redis-backed cache store.
//!
//! Connections come from a bounded deadpool: a caller that finds the pool
//! exhausted waits for a returned connection instead of failing fast, and
//! connections are health-checked when recycled. Entries are written
//! without expiry; invalidation is always an explicit `DEL`.

use deadpool_redis::{Config as PoolSetup, Pool, PoolConfig, Runtime};
use outcome::{Error, Outcome};
use redis::AsyncCommands;
use tracing::debug;

use crate::CacheStore;

/// Connection settings for the cache pool.
#[derive(Debug, Clone)]
pub struct RedisCacheSettings {
    /// `redis://` or, with TLS, `rediss://` URL carrying host, port and
    /// authentication key.
    pub url: String,
    /// Upper bound on pooled connections.
    pub pool_max: usize,
}

impl Default for RedisCacheSettings {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_max: 128,
        }
    }
}

pub struct RedisCache {
    pool: Pool,
}

impl RedisCache {
    pub fn connect(settings: &RedisCacheSettings) -> Outcome<Self> {
        let mut setup = PoolSetup::from_url(settings.url.clone());
        setup.pool = Some(PoolConfig::new(settings.pool_max));
        let pool = setup
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::internal(format!("cache pool setup failed: {e}")))?;
        Ok(Self { pool })
    }

    async fn conn(&self) -> Outcome<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| Error::internal(format!("cache connection unavailable: {e}")))
    }
}

#[async_trait::async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Outcome<Option<String>> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| Error::internal(e.to_string()))?;
        match &value {
            Some(_) => debug!(key = %key, "cache hit"),
            None => debug!(key = %key, "cache miss"),
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Outcome<()> {
        let mut conn = self.conn().await?;
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| Error::internal(e.to_string()))?;
        debug!(key = %key, "cache set");
        Ok(())
    }

    async fn del(&self, key: &str) -> Outcome<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| Error::internal(e.to_string()))?;
        debug!(key = %key, "cache invalidate");
        Ok(())
    }
}
