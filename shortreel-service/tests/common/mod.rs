//! Shared harness: both services wired over the document backend, the
//! in-memory cache and a temp-dir blob store, with the cascade worker
//! running and its report stream exposed.

use std::sync::Arc;

use tokio::sync::mpsc;

use shortreel_cache::{CacheStore, MemoryCache};
use shortreel_service::auth::token::TokenMinter;
use shortreel_service::blobs::{BlobStorage, FsBlobStorage};
use shortreel_service::domain::models::NewAccount;
use shortreel_service::services::{AccountService, PostService};
use shortreel_service::storage::document::DocumentBackend;
use shortreel_service::storage::Backend;
use shortreel_service::workers::cascade::{CascadeHandle, CascadeReport, CascadeWorker};

pub struct TestApp {
    pub accounts: Arc<AccountService>,
    pub posts: Arc<PostService>,
    pub blobs: Arc<dyn BlobStorage>,
    pub reports: mpsc::Receiver<CascadeReport>,
    _blob_dir: tempfile::TempDir,
}

pub async fn spawn_app() -> TestApp {
    let blob_dir = tempfile::tempdir().expect("temp blob dir");
    let blobs: Arc<dyn BlobStorage> = Arc::new(
        FsBlobStorage::new(blob_dir.path())
            .await
            .expect("blob storage"),
    );
    spawn_app_with_blobs(blobs, blob_dir).await
}

/// Same wiring with a caller-supplied blob store, for tests that
/// inject faults on the blob side.
pub async fn spawn_app_with_blobs(
    blobs: Arc<dyn BlobStorage>,
    blob_dir: tempfile::TempDir,
) -> TestApp {
    let backend: Arc<dyn Backend> = Arc::new(DocumentBackend::new());
    let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
    let tokens = TokenMinter::new("test-secret", 300);

    let (cascades, jobs) = CascadeHandle::channel(8);
    let accounts = Arc::new(AccountService::new(
        backend.clone(),
        Some(cache.clone()),
        tokens.clone(),
        cascades,
    ));
    let posts = Arc::new(PostService::new(
        backend,
        Some(cache),
        accounts.clone(),
        blobs.clone(),
        tokens,
        "http://localhost:8080",
    ));
    let (_worker, reports) = CascadeWorker::spawn(jobs, posts.clone(), blobs.clone());

    TestApp {
        accounts,
        posts,
        blobs,
        reports,
        _blob_dir: blob_dir,
    }
}

pub fn new_account(id: &str, password: &str) -> NewAccount {
    NewAccount {
        account_id: id.to_string(),
        password: password.to_string(),
        display_name: format!("User {id}"),
        email: format!("{id}@example.org"),
    }
}
