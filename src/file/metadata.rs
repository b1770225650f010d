//! File records and repository.
//!
//! A file's location is stored as `folder_id` plus a nullable
//! `original_folder_id`. The nullable column never leaves this module:
//! rows are decoded into [`FileLocation`].

use serde::Serialize;
use sqlx::SqlitePool;

use crate::{FilecabError, Result};

/// Where a file currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FileLocation {
    /// In a regular folder.
    Active { folder_id: i64 },
    /// In Trash, remembering where it came from.
    Trashed { trash_id: i64, from_folder_id: i64 },
}

impl FileLocation {
    fn from_columns(folder_id: i64, original_folder_id: Option<i64>) -> Self {
        match original_folder_id {
            Some(from_folder_id) => FileLocation::Trashed {
                trash_id: folder_id,
                from_folder_id,
            },
            None => FileLocation::Active { folder_id },
        }
    }

    fn columns(&self) -> (i64, Option<i64>) {
        match *self {
            FileLocation::Active { folder_id } => (folder_id, None),
            FileLocation::Trashed {
                trash_id,
                from_folder_id,
            } => (trash_id, Some(from_folder_id)),
        }
    }

    /// The folder the file is physically in.
    pub fn folder_id(&self) -> i64 {
        self.columns().0
    }

    /// The recorded origin, present only while trashed.
    pub fn origin(&self) -> Option<i64> {
        self.columns().1
    }
}

#[derive(sqlx::FromRow)]
struct FileRow {
    id: i64,
    folder_id: i64,
    original_folder_id: Option<i64>,
    name: String,
    size: i64,
    content_type: String,
    blob_handle: String,
    url: String,
    created_at: String,
}

/// A stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Unique file ID.
    pub id: i64,
    /// Name as uploaded.
    pub name: String,
    /// Size in bytes.
    pub size: i64,
    /// MIME type guessed from the name.
    pub content_type: String,
    /// Blob store handle.
    pub blob_handle: String,
    /// Public retrieval URL.
    pub url: String,
    /// Upload timestamp.
    pub created_at: String,
    /// Current location.
    pub location: FileLocation,
}

impl From<FileRow> for FileRecord {
    fn from(row: FileRow) -> Self {
        Self {
            location: FileLocation::from_columns(row.folder_id, row.original_folder_id),
            id: row.id,
            name: row.name,
            size: row.size,
            content_type: row.content_type,
            blob_handle: row.blob_handle,
            url: row.url,
            created_at: row.created_at,
        }
    }
}

/// Data for creating a file record. New files are always active.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// Target folder.
    pub folder_id: i64,
    /// Name as uploaded.
    pub name: String,
    /// Size in bytes.
    pub size: i64,
    /// MIME type.
    pub content_type: String,
    /// Blob store handle.
    pub blob_handle: String,
    /// Public retrieval URL.
    pub url: String,
}

const FILE_COLUMNS: &str =
    "id, folder_id, original_folder_id, name, size, content_type, blob_handle, url, created_at";

/// Repository for file records.
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an active file record.
    pub async fn create(&self, file: &NewFile) -> Result<FileRecord> {
        let result = sqlx::query(
            "INSERT INTO files (folder_id, name, size, content_type, blob_handle, url)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(file.folder_id)
        .bind(&file.name)
        .bind(file.size)
        .bind(&file.content_type)
        .bind(&file.blob_handle)
        .bind(&file.url)
        .execute(self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| FilecabError::NotFound("file".to_string()))
    }

    /// Get a file by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        let row = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(FileRecord::from))
    }

    /// List files stored directly in a folder, newest first.
    pub async fn list_by_folder(&self, folder_id: i64) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE folder_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(folder_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(FileRecord::from).collect())
    }

    /// List every file a user owns outside `trash_id`, newest first.
    pub async fn list_active_by_user(&self, user_id: i64, trash_id: i64) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRow>(
            "SELECT f.id, f.folder_id, f.original_folder_id, f.name, f.size, f.content_type,
                    f.blob_handle, f.url, f.created_at
             FROM files f
             JOIN folders d ON d.id = f.folder_id
             WHERE d.user_id = ? AND f.folder_id <> ? AND f.original_folder_id IS NULL
             ORDER BY f.created_at DESC, f.id DESC",
        )
        .bind(user_id)
        .bind(trash_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(FileRecord::from).collect())
    }

    /// Move a file from `from` to `to`.
    ///
    /// The update only applies if the row still holds `from`; returns false
    /// when it changed in the meantime.
    pub async fn relocate(&self, id: i64, from: &FileLocation, to: &FileLocation) -> Result<bool> {
        let (from_folder, from_origin) = from.columns();
        let (to_folder, to_origin) = to.columns();

        let result = sqlx::query(
            "UPDATE files SET folder_id = ?, original_folder_id = ?
             WHERE id = ? AND folder_id = ? AND original_folder_id IS ?",
        )
        .bind(to_folder)
        .bind(to_origin)
        .bind(id)
        .bind(from_folder)
        .bind(from_origin)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a file record.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
