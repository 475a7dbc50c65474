//! Shortreel cache layer.
//!
//! A pooled key/value store used strictly as a read-through,
//! write-invalidate cache: entries carry no TTL and live until a mutation
//! explicitly deletes them. The persistence backend stays authoritative;
//! a cache entry is never trusted over a backend row.

mod keys;
mod memory;
mod redis_store;

pub use keys::CacheKey;
pub use memory::MemoryCache;
pub use redis_store::{RedisCache, RedisCacheSettings};

use outcome::Outcome;

/// Object-safe cache operations shared by the Redis and in-memory stores.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a raw entry. `Ok(None)` is a miss.
    async fn get(&self, key: &str) -> Outcome<Option<String>>;

    /// Store an entry without expiry.
    async fn set(&self, key: &str, value: &str) -> Outcome<()>;

    /// Explicitly invalidate an entry. Deleting an absent key is a no-op.
    async fn del(&self, key: &str) -> Outcome<()>;
}
