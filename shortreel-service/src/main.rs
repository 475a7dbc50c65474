use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use shortreel_cache::{CacheStore, RedisCache, RedisCacheSettings};
use shortreel_service::auth::token::TokenMinter;
use shortreel_service::blobs::{BlobStorage, FsBlobStorage};
use shortreel_service::config::{Config, StorageKind};
use shortreel_service::services::{AccountService, PostService};
use shortreel_service::storage::document::DocumentBackend;
use shortreel_service::storage::relational::PgBackend;
use shortreel_service::storage::Backend;
use shortreel_service::workers::cascade::{CascadeHandle, CascadeWorker};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    info!(env = %config.app.env, backend = ?config.storage.backend, "starting shortreel-service");

    let backend: Arc<dyn Backend> = match config.storage.backend {
        StorageKind::Postgres => {
            let pg = PgBackend::connect(
                &config.database.url,
                config.database.max_connections,
                config.database.min_connections,
            )
            .await
            .context("connecting to Postgres")?;
            pg.run_migrations().await.context("running migrations")?;
            Arc::new(pg)
        }
        StorageKind::Document => Arc::new(DocumentBackend::new()),
    };

    let cache: Option<Arc<dyn CacheStore>> = if config.cache.enabled {
        let settings = RedisCacheSettings {
            url: config.cache.url.clone(),
            pool_max: config.cache.pool_max,
        };
        Some(Arc::new(
            RedisCache::connect(&settings).context("connecting to cache")?,
        ))
    } else {
        None
    };

    let blobs: Arc<dyn BlobStorage> = Arc::new(
        FsBlobStorage::new(&config.blobs.root_dir)
            .await
            .context("preparing blob storage")?,
    );

    let tokens = TokenMinter::new(config.token.secret.as_bytes(), config.token.ttl_secs);
    let (cascades, jobs) = CascadeHandle::channel(64);

    let accounts = Arc::new(AccountService::new(
        backend.clone(),
        cache.clone(),
        tokens.clone(),
        cascades,
    ));
    let posts = Arc::new(PostService::new(
        backend,
        cache,
        accounts.clone(),
        blobs.clone(),
        tokens,
        config.app.public_base_url.clone(),
    ));

    let (worker, mut reports) = CascadeWorker::spawn(jobs, posts, blobs);
    // The worker logs each report itself; keep the stream drained.
    let report_drain = tokio::spawn(async move { while reports.recv().await.is_some() {} });

    info!("shortreel-service ready");
    shutdown_signal().await;
    info!("shutting down");

    worker.abort();
    report_drain.abort();
    drop(accounts);
    Ok(())
}
