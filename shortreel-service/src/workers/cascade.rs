//! Account-deletion cascade worker.
//!
//! Account deletion enqueues a job here instead of spawning a detached
//! thread: the worker runs each cascade with a bounded retry policy and
//! publishes a completion report per job. The steps are idempotent
//! (`NotFound` during a re-run is absorbed), so re-driving a partially
//! failed cascade is safe. Failures never reach the caller that deleted
//! the account; they surface on the report stream.

use std::sync::Arc;
use std::time::Duration;

use outcome::{ErrorKind, Outcome};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::blobs::BlobStorage;
use crate::services::PostService;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(200);

/// One dependent-data cascade: everything owned by `owner_id`, authorized
/// by an internal token rather than a password.
#[derive(Debug)]
pub struct CascadeJob {
    pub owner_id: String,
    pub token: String,
}

/// Completion report for one job. `outcome` carries the number of purged
/// posts on success.
#[derive(Debug)]
pub struct CascadeReport {
    pub owner_id: String,
    pub attempts: u32,
    pub outcome: Outcome<usize>,
}

/// Sending side of the cascade queue, held by the account service.
#[derive(Clone)]
pub struct CascadeHandle {
    tx: mpsc::Sender<CascadeJob>,
}

impl CascadeHandle {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<CascadeJob>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Enqueue a cascade. Blocks when the queue is full; a closed queue
    /// (worker gone) is logged, leaving the dependents orphaned until the
    /// next deployment's cleanup.
    pub async fn enqueue(&self, job: CascadeJob) {
        let owner_id = job.owner_id.clone();
        if self.tx.send(job).await.is_err() {
            warn!(owner_id = %owner_id, "cascade worker unavailable, dependents orphaned");
        }
    }
}

pub struct CascadeWorker;

impl CascadeWorker {
    /// Start the worker task. It drains the job queue until every handle
    /// is dropped, then exits. Reports are published per job; an
    /// unobserved report stream is simply dropped.
    pub fn spawn(
        mut jobs: mpsc::Receiver<CascadeJob>,
        posts: Arc<PostService>,
        blobs: Arc<dyn BlobStorage>,
    ) -> (JoinHandle<()>, mpsc::Receiver<CascadeReport>) {
        let (report_tx, report_rx) = mpsc::channel(64);
        let handle = tokio::spawn(async move {
            while let Some(job) = jobs.recv().await {
                let report = Self::run_job(&posts, &blobs, job).await;
                match &report.outcome {
                    Ok(purged) => {
                        info!(owner_id = %report.owner_id, purged, attempts = report.attempts, "cascade complete")
                    }
                    Err(e) => {
                        warn!(owner_id = %report.owner_id, attempts = report.attempts, error = %e, "cascade failed")
                    }
                }
                let _ = report_tx.send(report).await;
            }
        });
        (handle, report_rx)
    }

    async fn run_job(
        posts: &PostService,
        blobs: &Arc<dyn BlobStorage>,
        job: CascadeJob,
    ) -> CascadeReport {
        let mut attempts = 0;
        // Purged post ids survive across attempts so a retry after a
        // partial blob failure still cleans the remaining payloads.
        let mut purged: Option<Vec<String>> = None;

        let outcome = loop {
            attempts += 1;
            match Self::attempt(posts, blobs, &job, &mut purged).await {
                Ok(count) => break Ok(count),
                Err(e) if attempts < MAX_ATTEMPTS => {
                    warn!(
                        owner_id = %job.owner_id,
                        attempt = attempts,
                        error = %e,
                        "cascade attempt failed, retrying"
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => break Err(e),
            }
        };

        CascadeReport {
            owner_id: job.owner_id,
            attempts,
            outcome,
        }
    }

    async fn attempt(
        posts: &PostService,
        blobs: &Arc<dyn BlobStorage>,
        job: &CascadeJob,
        purged: &mut Option<Vec<String>>,
    ) -> Outcome<usize> {
        if purged.is_none() {
            let ids = posts
                .delete_all_by_owner(&job.owner_id, "", &job.token)
                .await?;
            *purged = Some(ids);
        }

        let ids: &[String] = purged.as_deref().unwrap_or(&[]);
        for post_id in ids {
            match blobs.delete(post_id).await {
                Ok(()) => {}
                // never uploaded, or already removed by an earlier attempt
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(ids.len())
    }
}
