//! Staging area for incoming uploads.
//!
//! The transport writes request bodies here before the lifecycle engine
//! hands them to the blob store. A staged file is removed once the upload
//! concludes, whatever the outcome.

use std::path::{Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

use crate::Result;

/// Directory holding temporary upload copies.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    /// Create the staging area, creating the directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Staging directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` to a fresh temporary file.
    pub async fn stage(&self, original_name: &str, bytes: &[u8]) -> Result<StagedUpload> {
        let path = self.dir.join(format!("{}.part", Uuid::new_v4()));
        tokio::fs::write(&path, bytes).await?;

        Ok(StagedUpload {
            path,
            original_name: original_name.to_string(),
            size: bytes.len() as u64,
        })
    }
}

/// A temporary local copy of an uploaded file.
#[derive(Debug)]
pub struct StagedUpload {
    /// Location of the temporary copy.
    pub path: PathBuf,
    /// File name supplied by the client.
    pub original_name: String,
    /// Size in bytes.
    pub size: u64,
}

impl StagedUpload {
    /// Read the staged bytes.
    pub async fn read(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(&self.path).await?)
    }

    /// Remove the temporary copy.
    pub async fn discard(self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove staged upload"),
        }
    }
}
