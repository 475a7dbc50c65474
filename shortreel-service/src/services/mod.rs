pub mod accounts;
pub mod posts;

pub use accounts::AccountService;
pub use posts::PostService;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use shortreel_cache::CacheStore;
use tracing::warn;

/// Cache-aside access shared by both services. Caching is optional; with
/// no store attached every call is a no-op and reads go straight to the
/// backend. Cache failures degrade to the backend and never fail the
/// surrounding operation.
pub(crate) struct CacheSide {
    inner: Option<Arc<dyn CacheStore>>,
}

impl CacheSide {
    pub(crate) fn new(inner: Option<Arc<dyn CacheStore>>) -> Self {
        Self { inner }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cache = self.inner.as_ref()?;
        match cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key = %key, error = %e, "corrupt cache entry, invalidating");
                    let _ = cache.del(key).await;
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "cache read degraded to backend");
                None
            }
        }
    }

    pub(crate) async fn put_json<T: Serialize>(&self, key: &str, value: &T) {
        let Some(cache) = self.inner.as_ref() else {
            return;
        };
        match serde_json::to_string(value) {
            Ok(raw) => {
                if let Err(e) = cache.set(key, &raw).await {
                    warn!(key = %key, error = %e, "cache populate failed");
                }
            }
            Err(e) => warn!(key = %key, error = %e, "cache encode failed"),
        }
    }

    pub(crate) async fn del(&self, key: &str) {
        let Some(cache) = self.inner.as_ref() else {
            return;
        };
        if let Err(e) = cache.del(key).await {
            warn!(key = %key, error = %e, "cache invalidation failed");
        }
    }
}
