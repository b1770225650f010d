//! File lifecycle engine.
//!
//! Owns the folder invariants, the trash state machine and upload
//! orchestration. Every operation takes the caller's user ID and checks
//! ownership through the folder a file currently lives in.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::db::Database;
use crate::{FilecabError, Result};

use super::blob::BlobStore;
use super::folder::{Folder, FolderRepository, FolderSummary, ReservedFolder, ALL_FILES, TRASH};
use super::metadata::{FileLocation, FileRecord, FileRepository, NewFile};
use super::upload::{StagedUpload, StagingArea};
use super::{MAX_FILENAME_LENGTH, MAX_FOLDER_NAME_LENGTH};

/// The reserved folders of one user.
#[derive(Debug, Clone)]
pub struct ReservedFolders {
    pub all_files: Folder,
    pub trash: Folder,
}

/// Outcome of a restore.
#[derive(Debug, Clone)]
pub struct Restored {
    /// The file in its new location.
    pub file: FileRecord,
    /// True when the recorded origin no longer existed and the file landed
    /// in All Files instead.
    pub origin_missing: bool,
}

/// Outcome of emptying the trash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmptyTrashReport {
    pub deleted: u64,
    pub failed: u64,
}

/// File and folder lifecycle service.
pub struct FileService {
    db: Database,
    blobs: Arc<dyn BlobStore>,
    staging: StagingArea,
    max_upload_bytes: u64,
}

impl FileService {
    /// Create a new FileService.
    pub fn new(
        db: Database,
        blobs: Arc<dyn BlobStore>,
        staging: StagingArea,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            db,
            blobs,
            staging,
            max_upload_bytes,
        }
    }

    /// Staging area uploads are written to before [`FileService::upload`].
    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Largest accepted upload in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    fn folders(&self) -> FolderRepository<'_> {
        FolderRepository::new(self.db.pool())
    }

    fn files(&self) -> FileRepository<'_> {
        FileRepository::new(self.db.pool())
    }

    /// Create "All Files" and "Trash" for the user if absent.
    pub async fn ensure_reserved_folders(&self, user_id: i64) -> Result<ReservedFolders> {
        let folders = self.folders();
        let all_files = folders.ensure(user_id, ALL_FILES).await?;
        let trash = folders.ensure(user_id, TRASH).await?;
        Ok(ReservedFolders { all_files, trash })
    }

    /// List the user's folders with file counts.
    ///
    /// The All Files count covers the whole flattened view.
    pub async fn list_folders(&self, user_id: i64) -> Result<Vec<FolderSummary>> {
        let mut folders = self.folders().list_by_user(user_id).await?;

        if let Some(trash_id) = folders
            .iter()
            .find(|s| s.folder.is_trash())
            .map(|s| s.folder.id)
        {
            let active = self.files().list_active_by_user(user_id, trash_id).await?.len();
            if let Some(all) = folders.iter_mut().find(|s| s.folder.is_all_files()) {
                all.file_count = active as i64;
            }
        }

        Ok(folders)
    }

    /// Get a folder the user owns.
    pub async fn get_folder(&self, user_id: i64, folder_id: i64) -> Result<Folder> {
        let folder = self
            .folders()
            .get_by_id(folder_id)
            .await?
            .ok_or_else(|| FilecabError::NotFound("folder".to_string()))?;

        if folder.user_id != user_id {
            return Err(FilecabError::Permission(
                "folder belongs to another user".to_string(),
            ));
        }
        Ok(folder)
    }

    /// Create a user folder.
    pub async fn create_folder(&self, user_id: i64, name: &str) -> Result<Folder> {
        let name = check_folder_name(name)?;
        let folder = self.folders().create(user_id, name).await?;

        info!(user_id, folder_id = folder.id, name, "Folder created");
        Ok(folder)
    }

    /// Rename a user folder. Reserved folders cannot be renamed.
    pub async fn rename_folder(&self, user_id: i64, folder_id: i64, name: &str) -> Result<Folder> {
        let folder = self.get_folder(user_id, folder_id).await?;
        if folder.is_reserved() {
            return Err(FilecabError::Permission(format!(
                "\"{}\" is a system folder and cannot be renamed",
                folder.name
            )));
        }

        let name = check_folder_name(name)?;
        let renamed = self
            .folders()
            .rename(folder.id, name)
            .await?
            .ok_or_else(|| FilecabError::NotFound("folder".to_string()))?;

        info!(user_id, folder_id, from = %folder.name, to = name, "Folder renamed");
        Ok(renamed)
    }

    /// Delete a user folder, moving its files to Trash.
    ///
    /// Returns the number of files moved.
    pub async fn delete_folder(&self, user_id: i64, folder_id: i64) -> Result<u64> {
        let folder = self.get_folder(user_id, folder_id).await?;
        if folder.is_reserved() {
            return Err(FilecabError::Permission(format!(
                "\"{}\" is a system folder and cannot be deleted",
                folder.name
            )));
        }

        let trash = self.require_trash(user_id).await?;
        let moved = self.folders().delete_into_trash(folder.id, trash.id).await?;

        info!(user_id, folder_id, moved, "Folder deleted, contents moved to trash");
        Ok(moved)
    }

    /// List the files in a folder. All Files lists every non-trashed file.
    pub async fn list_folder_files(&self, user_id: i64, folder_id: i64) -> Result<Vec<FileRecord>> {
        let folder = self.get_folder(user_id, folder_id).await?;

        if folder.is_all_files() {
            let trash = self.require_trash(user_id).await?;
            return self.files().list_active_by_user(user_id, trash.id).await;
        }
        self.files().list_by_folder(folder.id).await
    }

    /// List the user's Trash.
    pub async fn list_trash(&self, user_id: i64) -> Result<Vec<FileRecord>> {
        let trash = self.require_trash(user_id).await?;
        self.files().list_by_folder(trash.id).await
    }

    /// Get a file the user owns.
    pub async fn get_file(&self, user_id: i64, file_id: i64) -> Result<FileRecord> {
        Ok(self.owned_file(user_id, file_id).await?.0)
    }

    /// Retrieval URL of a file the user owns.
    pub async fn download_url(&self, user_id: i64, file_id: i64) -> Result<String> {
        Ok(self.get_file(user_id, file_id).await?.url)
    }

    /// Move an active file into the user's Trash, recording its origin.
    pub async fn move_to_trash(&self, user_id: i64, file_id: i64) -> Result<FileRecord> {
        let (file, _) = self.owned_file(user_id, file_id).await?;
        let trash = self.require_trash(user_id).await?;

        let from_folder_id = match file.location {
            FileLocation::Active { folder_id } if folder_id != trash.id => folder_id,
            _ => {
                return Err(FilecabError::Precondition(
                    "file is already in the trash".to_string(),
                ))
            }
        };

        let to = FileLocation::Trashed {
            trash_id: trash.id,
            from_folder_id,
        };
        let file = self.relocate(file, to).await?;

        info!(user_id, file_id, from_folder_id, "File moved to trash");
        Ok(file)
    }

    /// Return a trashed file to the folder it came from.
    ///
    /// If that folder has since been deleted the file goes to All Files.
    pub async fn restore(&self, user_id: i64, file_id: i64) -> Result<Restored> {
        let (file, folder) = self.owned_file(user_id, file_id).await?;

        let from_folder_id = match file.location {
            FileLocation::Trashed { from_folder_id, .. } => from_folder_id,
            FileLocation::Active { .. } if folder.is_trash() => {
                return Err(FilecabError::Precondition(
                    "file has no recorded origin folder".to_string(),
                ))
            }
            FileLocation::Active { .. } => {
                return Err(FilecabError::Precondition(
                    "file is not in the trash".to_string(),
                ))
            }
        };

        let origin = self
            .folders()
            .get_by_id(from_folder_id)
            .await?
            .filter(|f| f.user_id == user_id);

        let (target, origin_missing) = match origin {
            Some(folder) => (folder.id, false),
            None => {
                let all_files = self.folders().ensure(user_id, ALL_FILES).await?;
                warn!(
                    user_id,
                    file_id, from_folder_id, "Origin folder gone, restoring into All Files"
                );
                (all_files.id, true)
            }
        };

        let file = self
            .relocate(file, FileLocation::Active { folder_id: target })
            .await?;

        info!(user_id, file_id, folder_id = target, "File restored");
        Ok(Restored {
            file,
            origin_missing,
        })
    }

    /// Delete a trashed file's blob and then its record.
    ///
    /// The record is kept if the blob store fails.
    pub async fn permanently_delete(&self, user_id: i64, file_id: i64) -> Result<()> {
        let (file, folder) = self.owned_file(user_id, file_id).await?;
        if !folder.is_trash() {
            return Err(FilecabError::Permission(
                "only files in the trash can be permanently deleted".to_string(),
            ));
        }

        if let Err(e) = self.blobs.delete(&file.blob_handle).await {
            error!(
                user_id,
                file_id,
                handle = %file.blob_handle,
                error = %e,
                "Blob delete failed, keeping file record"
            );
            return Err(FilecabError::Upstream(e.to_string()));
        }

        match self.files().delete(file.id).await {
            Ok(true) => {
                info!(user_id, file_id, "File permanently deleted");
                Ok(())
            }
            Ok(false) => {
                warn!(user_id, file_id, "File record already gone after blob delete");
                Ok(())
            }
            Err(e) => {
                error!(
                    user_id,
                    file_id,
                    handle = %file.blob_handle,
                    inconsistency = "orphaned_record",
                    error = %e,
                    "Blob deleted but file record could not be removed"
                );
                Err(e)
            }
        }
    }

    /// Permanently delete everything in the user's Trash.
    ///
    /// Failures are counted, not fatal.
    pub async fn empty_trash(&self, user_id: i64) -> Result<EmptyTrashReport> {
        let mut report = EmptyTrashReport::default();

        for file in self.list_trash(user_id).await? {
            match self.permanently_delete(user_id, file.id).await {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    warn!(user_id, file_id = file.id, error = %e, "Could not delete trashed file");
                    report.failed += 1;
                }
            }
        }

        info!(user_id, deleted = report.deleted, failed = report.failed, "Trash emptied");
        Ok(report)
    }

    /// Store a staged upload in a folder.
    ///
    /// The staged file is removed when this returns, whatever the outcome.
    pub async fn upload(
        &self,
        user_id: i64,
        folder_id: i64,
        staged: StagedUpload,
    ) -> Result<FileRecord> {
        let result = self.store_upload(user_id, folder_id, &staged).await;
        staged.discard().await;
        result
    }

    async fn store_upload(
        &self,
        user_id: i64,
        folder_id: i64,
        staged: &StagedUpload,
    ) -> Result<FileRecord> {
        let name = check_file_name(&staged.original_name)?;
        if staged.size > self.max_upload_bytes {
            return Err(FilecabError::Validation(format!(
                "file exceeds the {} byte upload limit",
                self.max_upload_bytes
            )));
        }

        let folder = self.get_folder(user_id, folder_id).await?;
        if folder.is_trash() {
            return Err(FilecabError::Permission(
                "files cannot be uploaded into the trash".to_string(),
            ));
        }

        let bytes = staged.read().await?;
        let blob = self
            .blobs
            .put(name, &bytes)
            .await
            .map_err(|e| {
                error!(user_id, folder_id, name, error = %e, "Upload to blob store failed");
                FilecabError::UploadFailed {
                    attempts: e.attempts(),
                    reason: e.to_string(),
                }
            })?;

        let new_file = NewFile {
            folder_id: folder.id,
            name: name.to_string(),
            size: bytes.len() as i64,
            content_type: mime_guess::from_path(name)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
            blob_handle: blob.handle.clone(),
            url: blob.url,
        };

        match self.files().create(&new_file).await {
            Ok(file) => {
                info!(user_id, folder_id, file_id = file.id, size = file.size, "File uploaded");
                Ok(file)
            }
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&blob.handle).await {
                    warn!(handle = %blob.handle, error = %cleanup, "Could not remove blob of failed upload");
                }
                Err(e)
            }
        }
    }

    async fn require_trash(&self, user_id: i64) -> Result<Folder> {
        self.folders()
            .get_by_name(user_id, TRASH)
            .await?
            .ok_or_else(|| FilecabError::Precondition("trash folder is missing".to_string()))
    }

    /// Load a file and the folder it lives in, checking ownership.
    async fn owned_file(&self, user_id: i64, file_id: i64) -> Result<(FileRecord, Folder)> {
        let file = self
            .files()
            .get_by_id(file_id)
            .await?
            .ok_or_else(|| FilecabError::NotFound("file".to_string()))?;

        let folder = self
            .folders()
            .get_by_id(file.location.folder_id())
            .await?
            .ok_or_else(|| FilecabError::NotFound("folder".to_string()))?;

        if folder.user_id != user_id {
            return Err(FilecabError::Permission(
                "file belongs to another user".to_string(),
            ));
        }
        Ok((file, folder))
    }

    async fn relocate(&self, mut file: FileRecord, to: FileLocation) -> Result<FileRecord> {
        if !self.files().relocate(file.id, &file.location, &to).await? {
            return Err(FilecabError::Conflict(
                "file was modified concurrently, reload and try again".to_string(),
            ));
        }
        file.location = to;
        Ok(file)
    }
}

/// Trim and check a folder name a user wants to use.
fn check_folder_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FilecabError::Validation(
            "folder name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_FOLDER_NAME_LENGTH {
        return Err(FilecabError::Validation(format!(
            "folder name must be at most {MAX_FOLDER_NAME_LENGTH} characters"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(FilecabError::Validation(
            "folder name contains invalid characters".to_string(),
        ));
    }
    if ReservedFolder::from_name(name).is_some() {
        return Err(FilecabError::Permission(format!(
            "\"{name}\" is reserved for a system folder"
        )));
    }
    Ok(name)
}

fn check_file_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FilecabError::Validation("file name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_FILENAME_LENGTH {
        return Err(FilecabError::Validation(format!(
            "file name must be at most {MAX_FILENAME_LENGTH} characters"
        )));
    }
    if name.chars().any(|c| c.is_control() || c == '/' || c == '\\') {
        return Err(FilecabError::Validation(
            "file name contains invalid characters".to_string(),
        ));
    }
    Ok(name)
}
