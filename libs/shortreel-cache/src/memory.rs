//! In-process cache store, used by tests and single-node deployments.

use std::collections::HashMap;

use outcome::Outcome;
use tokio::sync::RwLock;

use crate::CacheStore;

#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Outcome<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Outcome<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn del(&self, key: &str) -> Outcome<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_returns_last_value_until_deleted() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("k").await.unwrap(), None);

        cache.set("k", "v1").await.unwrap();
        cache.set("k", "v2").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v2".to_string()));

        cache.del("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);

        // deleting an absent key is a no-op
        cache.del("k").await.unwrap();
    }
}
