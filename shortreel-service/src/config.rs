//! Configuration loaded from environment variables.

use anyhow::{Context, Result};

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub storage: StorageConfig,
    pub token: TokenConfig,
    pub blobs: BlobConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod).
    pub env: String,
    /// Public base URL used to form post payload locators.
    pub public_base_url: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Postgres URL; required only when the relational backend is active.
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// `redis://` or `rediss://` URL (host, port, auth key, TLS).
    pub url: String,
    pub pool_max: usize,
    /// Disabled means every read goes straight to the backend.
    pub enabled: bool,
}

/// Which persistence backend the services run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Postgres,
    Document,
}

impl StorageKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "postgres" => Some(StorageKind::Postgres),
            "document" => Some(StorageKind::Document),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageKind,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl_secs: i64,
}

#[derive(Debug, Clone)]
pub struct BlobConfig {
    pub root_dir: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
        };

        let backend = match std::env::var("STORAGE_BACKEND") {
            Ok(value) => StorageKind::parse(&value)
                .with_context(|| format!("unknown STORAGE_BACKEND {value:?}"))?,
            Err(_) => StorageKind::Postgres,
        };
        let storage = StorageConfig { backend };

        let database = DatabaseConfig {
            url: match backend {
                StorageKind::Postgres => {
                    std::env::var("DATABASE_URL").context("DATABASE_URL is required")?
                }
                StorageKind::Document => std::env::var("DATABASE_URL").unwrap_or_default(),
            },
            max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            min_connections: std::env::var("DATABASE_MIN_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        };

        let cache = CacheConfig {
            url: std::env::var("CACHE_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            pool_max: std::env::var("CACHE_POOL_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(128),
            enabled: std::env::var("CACHE_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        };

        let token = TokenConfig {
            secret: std::env::var("TOKEN_SECRET").context("TOKEN_SECRET is required")?,
            ttl_secs: std::env::var("TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
        };

        let blobs = BlobConfig {
            root_dir: std::env::var("BLOB_ROOT")
                .unwrap_or_else(|_| "./blobs".to_string()),
        };

        Ok(Self {
            app,
            database,
            cache,
            storage,
            token,
            blobs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_kind_parses_known_backends() {
        assert_eq!(StorageKind::parse("postgres"), Some(StorageKind::Postgres));
        assert_eq!(StorageKind::parse("Document"), Some(StorageKind::Document));
        assert_eq!(StorageKind::parse("cosmos"), None);
    }
}
