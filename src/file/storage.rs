//! Local filesystem blob store.
//!
//! Blobs are stored under UUID-based names in a sharded directory tree:
//! ```text
//! {base_path}/
//! ├── ab/
//! │   └── ab12cd34-5678-90ab-cdef-123456789012.pdf
//! └── cd/
//!     └── cd90ab12-3456-7890-abcd-ef1234567890.bin
//! ```
//! The same tree is served read-only under `public_url`.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use super::blob::{BlobError, BlobStore, StoredBlob};
use crate::Result;

/// Blob store writing to a local directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    base_path: PathBuf,
    public_url: String,
}

impl LocalBlobStore {
    /// Create a store rooted at `base_path`, creating the directory.
    pub fn new(base_path: impl Into<PathBuf>, public_url: impl Into<String>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;

        Ok(Self {
            base_path,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Root directory of the store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Filesystem path for a handle, or None if the handle is malformed.
    pub fn path_for(&self, handle: &str) -> Option<PathBuf> {
        if !is_valid_handle(handle) {
            return None;
        }
        Some(self.base_path.join(shard(handle)).join(handle))
    }

    fn url_for(&self, handle: &str) -> String {
        format!("{}/{}/{}", self.public_url, shard(handle), handle)
    }

    /// Generate a new stored name keeping the original extension.
    fn generate_handle(original_name: &str) -> String {
        let ext = Path::new(original_name)
            .extension()
            .and_then(|s| s.to_str())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "bin".to_string());
        format!("{}.{ext}", Uuid::new_v4())
    }
}

fn shard(handle: &str) -> &str {
    handle.get(..2).unwrap_or(handle)
}

/// Handles are generated names: no separators, no parent references.
fn is_valid_handle(handle: &str) -> bool {
    !handle.is_empty()
        && handle != "."
        && handle != ".."
        && handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

fn io_to_blob(e: io::Error, handle: &str) -> BlobError {
    match e.kind() {
        io::ErrorKind::NotFound => BlobError::NotFound(handle.to_string()),
        io::ErrorKind::PermissionDenied => BlobError::Permanent(e.to_string()),
        _ => BlobError::Transient(e.to_string()),
    }
}

/// Write `bytes` to `path` through a sibling `.part` file.
///
/// The blob only appears under its final name once fully written; on any
/// failure the partial file is removed.
async fn write_blob(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    let written = match tokio::fs::write(&partial, bytes).await {
        Ok(()) => tokio::fs::rename(&partial, path).await,
        Err(e) => Err(e),
    };

    if let Err(e) = written {
        if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
            if cleanup.kind() != io::ErrorKind::NotFound {
                warn!(path = %partial.display(), error = %cleanup, "Could not remove partial blob");
            }
        }
        return Err(e);
    }
    Ok(())
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, name: &str, bytes: &[u8]) -> std::result::Result<StoredBlob, BlobError> {
        let handle = Self::generate_handle(name);
        let path = self
            .path_for(&handle)
            .ok_or_else(|| BlobError::Permanent(format!("bad handle {handle}")))?;

        write_blob(&path, bytes)
            .await
            .map_err(|e| io_to_blob(e, &handle))?;

        debug!(handle = %handle, size = bytes.len(), "Stored blob");
        Ok(StoredBlob {
            url: self.url_for(&handle),
            handle,
        })
    }

    async fn delete(&self, handle: &str) -> std::result::Result<(), BlobError> {
        let path = self
            .path_for(handle)
            .ok_or_else(|| BlobError::NotFound(handle.to_string()))?;

        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| io_to_blob(e, handle))?;

        debug!(handle, "Deleted blob");
        Ok(())
    }
}
