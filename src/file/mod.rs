//! File management for filecab.
//!
//! - Per-user folders with the reserved "All Files" and "Trash"
//! - File records and the trash state machine
//! - Blob storage behind a retrying capability interface
//! - Upload staging

mod blob;
mod folder;
mod metadata;
mod service;
mod storage;
mod upload;

pub use blob::{Backoff, BlobError, BlobStore, RetryPolicy, RetryingBlobStore, StoredBlob};
pub use folder::{Folder, FolderRepository, FolderSummary, ReservedFolder, ALL_FILES, TRASH};
pub use metadata::{FileLocation, FileRecord, FileRepository, NewFile};
pub use service::{EmptyTrashReport, FileService, ReservedFolders, Restored};
pub use storage::LocalBlobStore;
pub use upload::{StagedUpload, StagingArea};

/// Maximum length for a file name (in characters).
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Maximum length for a folder name (in characters).
pub const MAX_FOLDER_NAME_LENGTH: usize = 100;
