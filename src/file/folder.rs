//! Folder types and repository.
//!
//! Every user owns two system-managed folders, "All Files" and "Trash",
//! plus any number of folders they create. Names are unique per user.

use sqlx::SqlitePool;

use crate::{FilecabError, Result};

/// Name of the reserved folder listing every non-trashed file.
pub const ALL_FILES: &str = "All Files";

/// Name of the reserved soft-delete folder.
pub const TRASH: &str = "Trash";

/// The two system-managed folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedFolder {
    AllFiles,
    Trash,
}

impl ReservedFolder {
    /// Both reserved folders, in display order.
    pub const ALL: [ReservedFolder; 2] = [ReservedFolder::AllFiles, ReservedFolder::Trash];

    /// Folder name.
    pub fn name(self) -> &'static str {
        match self {
            ReservedFolder::AllFiles => ALL_FILES,
            ReservedFolder::Trash => TRASH,
        }
    }

    /// Match a folder name exactly.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.name() == name)
    }
}

/// A folder owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Folder {
    /// Unique folder ID.
    pub id: i64,
    /// Owner.
    pub user_id: i64,
    /// Folder name, unique per owner.
    pub name: String,
    /// When the folder was created.
    pub created_at: String,
}

impl Folder {
    /// Which reserved folder this is, if any.
    pub fn reserved(&self) -> Option<ReservedFolder> {
        ReservedFolder::from_name(&self.name)
    }

    /// Whether this folder is system-managed.
    pub fn is_reserved(&self) -> bool {
        self.reserved().is_some()
    }

    /// Whether this is the owner's Trash.
    pub fn is_trash(&self) -> bool {
        self.reserved() == Some(ReservedFolder::Trash)
    }

    /// Whether this is the owner's All Files view.
    pub fn is_all_files(&self) -> bool {
        self.reserved() == Some(ReservedFolder::AllFiles)
    }
}

/// A folder with the number of files it holds.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FolderSummary {
    #[sqlx(flatten)]
    pub folder: Folder,
    /// Files stored directly in the folder.
    pub file_count: i64,
}

fn duplicate_name(e: sqlx::Error) -> FilecabError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            FilecabError::Conflict("a folder with that name already exists".to_string())
        }
        other => other.into(),
    }
}

/// Repository for folder records.
pub struct FolderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FolderRepository<'a> {
    /// Create a new FolderRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a folder.
    ///
    /// Returns `Conflict` if the user already has a folder with that name.
    pub async fn create(&self, user_id: i64, name: &str) -> Result<Folder> {
        let result = sqlx::query("INSERT INTO folders (user_id, name) VALUES (?, ?)")
            .bind(user_id)
            .bind(name)
            .execute(self.pool)
            .await
            .map_err(duplicate_name)?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| FilecabError::NotFound("folder".to_string()))
    }

    /// Create the folder if the user has none with that name, then return it.
    ///
    /// Safe to run concurrently: the unique constraint absorbs the race.
    pub async fn ensure(&self, user_id: i64, name: &str) -> Result<Folder> {
        sqlx::query(
            "INSERT INTO folders (user_id, name) VALUES (?, ?)
             ON CONFLICT(user_id, name) DO NOTHING",
        )
        .bind(user_id)
        .bind(name)
        .execute(self.pool)
        .await?;

        self.get_by_name(user_id, name)
            .await?
            .ok_or_else(|| FilecabError::NotFound(format!("folder {name}")))
    }

    /// Get a folder by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(
            "SELECT id, user_id, name, created_at FROM folders WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(folder)
    }

    /// Get a user's folder by exact name.
    pub async fn get_by_name(&self, user_id: i64, name: &str) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(
            "SELECT id, user_id, name, created_at FROM folders WHERE user_id = ? AND name = ?",
        )
        .bind(user_id)
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(folder)
    }

    /// List a user's folders with file counts, reserved folders first.
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<FolderSummary>> {
        let folders = sqlx::query_as::<_, FolderSummary>(
            "SELECT d.id, d.user_id, d.name, d.created_at,
                    (SELECT COUNT(*) FROM files f WHERE f.folder_id = d.id) AS file_count
             FROM folders d
             WHERE d.user_id = ?
             ORDER BY CASE d.name WHEN ? THEN 0 WHEN ? THEN 1 ELSE 2 END, d.name, d.id",
        )
        .bind(user_id)
        .bind(ALL_FILES)
        .bind(TRASH)
        .fetch_all(self.pool)
        .await?;

        Ok(folders)
    }

    /// Rename a folder. Returns None if it no longer exists.
    pub async fn rename(&self, id: i64, name: &str) -> Result<Option<Folder>> {
        let result = sqlx::query("UPDATE folders SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(duplicate_name)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Delete a folder, moving its files into `trash_id` with the folder
    /// recorded as their origin. Returns the number of files moved.
    ///
    /// Runs in one transaction; fails with `NotFound` if the folder is gone.
    pub async fn delete_into_trash(&self, id: i64, trash_id: i64) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let moved = sqlx::query(
            "UPDATE files SET folder_id = ?, original_folder_id = folder_id
             WHERE folder_id = ? AND original_folder_id IS NULL",
        )
        .bind(trash_id)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let deleted = sqlx::query("DELETE FROM folders WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Err(FilecabError::NotFound("folder".to_string()));
        }

        tx.commit().await?;
        Ok(moved)
    }
}
