//! Filesystem-backed blob storage.

use std::path::PathBuf;

use async_trait::async_trait;
use outcome::{Error, Outcome};
use sha2::{Digest, Sha256};

use crate::blobs::{BlobStorage, CHUNK_SIZE};

pub struct FsBlobStorage {
    root: PathBuf,
}

impl FsBlobStorage {
    pub async fn new(root: impl Into<PathBuf>) -> Outcome<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| Error::internal(format!("blob root unavailable: {e}")))?;
        Ok(Self { root })
    }

    /// A blob key is a bare file name; anything that could traverse out
    /// of the root is rejected.
    fn resolve(&self, path: &str) -> Outcome<PathBuf> {
        if path.is_empty() {
            return Err(Error::bad_request("empty blob path"));
        }
        if path.contains('/') || path.contains('\\') || path.contains("..") {
            return Err(Error::bad_request(format!("invalid blob path {path}")));
        }
        Ok(self.root.join(path))
    }
}

fn digest(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

#[async_trait]
impl BlobStorage for FsBlobStorage {
    async fn write(&self, path: &str, bytes: &[u8]) -> Outcome<()> {
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(existing) => {
                if digest(&existing) == digest(bytes) {
                    Ok(())
                } else {
                    Err(Error::conflict(format!("blob {path} differs")))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => tokio::fs::write(&target, bytes)
                .await
                .map_err(|e| Error::internal(format!("blob write failed: {e}"))),
            Err(e) => Err(Error::internal(format!("blob read failed: {e}"))),
        }
    }

    async fn read(&self, path: &str) -> Outcome<Vec<u8>> {
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::not_found(format!("blob {path}")))
            }
            Err(e) => Err(Error::internal(format!("blob read failed: {e}"))),
        }
    }

    async fn read_chunked(
        &self,
        path: &str,
        sink: &mut (dyn for<'a> FnMut(&'a [u8]) + Send),
    ) -> Outcome<()> {
        let bytes = self.read(path).await?;
        for chunk in bytes.chunks(CHUNK_SIZE) {
            sink(chunk);
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> Outcome<()> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::not_found(format!("blob {path}")))
            }
            Err(e) => Err(Error::internal(format!("blob delete failed: {e}"))),
        }
    }
}
