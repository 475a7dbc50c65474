//! Blob collaborator contract: binary payload storage keyed by the post
//! identifier.

pub mod fs;

pub use fs::FsBlobStorage;

use async_trait::async_trait;
use outcome::Outcome;

/// Number of bytes handed to the sink per call in the streamed read.
pub const CHUNK_SIZE: usize = 4096;

#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Idempotent write: byte-identical existing content (compared via a
    /// SHA-256 digest) succeeds silently; differing content is a
    /// `Conflict`.
    async fn write(&self, path: &str, bytes: &[u8]) -> Outcome<()>;

    /// Full read; `NotFound` if the path is absent.
    async fn read(&self, path: &str) -> Outcome<Vec<u8>>;

    /// Streamed read delivering the content to `sink` in fixed
    /// [`CHUNK_SIZE`] chunks.
    async fn read_chunked(
        &self,
        path: &str,
        sink: &mut (dyn for<'a> FnMut(&'a [u8]) + Send),
    ) -> Outcome<()>;

    /// Delete; `NotFound` if the path is absent.
    async fn delete(&self, path: &str) -> Outcome<()>;
}
