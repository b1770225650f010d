//! Response DTOs for the Web API.

use serde::Serialize;

use crate::db::User;
use crate::file::{EmptyTrashReport, FileLocation, FileRecord, Folder, FolderSummary};

// ============================================================================
// Generic Response Wrapper
// ============================================================================

/// Severity of a transient notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
}

/// One-shot message shown alongside the resulting view.
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
    /// Notice for mutating requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data, notice: None }
    }

    /// Attach a notice.
    pub fn with_notice(mut self, level: NoticeLevel, message: impl Into<String>) -> Self {
        self.notice = Some(Notice {
            level,
            message: message.into(),
        });
        self
    }

    /// Response carrying a success notice.
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self::new(data).with_notice(NoticeLevel::Success, message)
    }
}

// ============================================================================
// Auth DTOs
// ============================================================================

/// User information in responses.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub created_at: String,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            created_at: user.created_at.clone(),
        }
    }
}

/// Login and registration response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Access token (JWT).
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Access token expiry in seconds.
    pub expires_in: u64,
    /// User information.
    pub user: UserInfo,
}

/// Token refresh response.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

// ============================================================================
// Folder DTOs
// ============================================================================

/// Folder in responses.
#[derive(Debug, Serialize)]
pub struct FolderResponse {
    pub id: i64,
    pub name: String,
    /// System-managed folder that cannot be renamed or deleted.
    pub reserved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_count: Option<i64>,
    pub created_at: String,
}

impl From<&Folder> for FolderResponse {
    fn from(folder: &Folder) -> Self {
        Self {
            id: folder.id,
            name: folder.name.clone(),
            reserved: folder.is_reserved(),
            file_count: None,
            created_at: folder.created_at.clone(),
        }
    }
}

impl From<&FolderSummary> for FolderResponse {
    fn from(summary: &FolderSummary) -> Self {
        Self {
            file_count: Some(summary.file_count),
            ..FolderResponse::from(&summary.folder)
        }
    }
}

/// Dashboard: the user plus every folder they own.
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub user: UserInfo,
    pub all_files_id: i64,
    pub trash_id: i64,
    pub folders: Vec<FolderResponse>,
}

/// A folder and the files it shows.
#[derive(Debug, Serialize)]
pub struct FolderContentsResponse {
    pub folder: FolderResponse,
    pub files: Vec<FileResponse>,
}

/// Result of deleting a folder.
#[derive(Debug, Serialize)]
pub struct DeletedFolderResponse {
    pub id: i64,
    /// Files moved to Trash with the deleted folder as origin.
    pub moved_to_trash: u64,
}

// ============================================================================
// File DTOs
// ============================================================================

/// File in responses.
#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub id: i64,
    pub name: String,
    pub size: i64,
    pub content_type: String,
    pub url: String,
    /// Folder the file currently sits in.
    pub folder_id: i64,
    pub location: FileLocation,
    pub created_at: String,
}

impl From<&FileRecord> for FileResponse {
    fn from(file: &FileRecord) -> Self {
        Self {
            id: file.id,
            name: file.name.clone(),
            size: file.size,
            content_type: file.content_type.clone(),
            url: file.url.clone(),
            folder_id: file.location.folder_id(),
            location: file.location,
            created_at: file.created_at.clone(),
        }
    }
}

/// Result of emptying the trash.
#[derive(Debug, Serialize)]
pub struct EmptyTrashResponse {
    pub deleted: u64,
    pub failed: u64,
}

impl From<EmptyTrashReport> for EmptyTrashResponse {
    fn from(report: EmptyTrashReport) -> Self {
        Self {
            deleted: report.deleted,
            failed: report.failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_omitted_when_absent() {
        let json = serde_json::to_value(ApiResponse::new(1)).unwrap();
        assert_eq!(json, serde_json::json!({ "data": 1 }));
    }

    #[test]
    fn test_notice_serialized() {
        let json = serde_json::to_value(ApiResponse::success("x", "Saved")).unwrap();
        assert_eq!(json["notice"]["level"], "success");
        assert_eq!(json["notice"]["message"], "Saved");
    }

    #[test]
    fn test_folder_response_marks_reserved() {
        let folder = Folder {
            id: 2,
            user_id: 1,
            name: "Trash".to_string(),
            created_at: "2024-01-01 00:00:00".to_string(),
        };
        let response = FolderResponse::from(&folder);
        assert!(response.reserved);
        assert!(response.file_count.is_none());

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("file_count").is_none());
    }

    #[test]
    fn test_file_response_location() {
        let file = FileRecord {
            id: 5,
            name: "report.pdf".to_string(),
            size: 500_000,
            content_type: "application/pdf".to_string(),
            blob_handle: "ab.pdf".to_string(),
            url: "/blobs/ab/ab.pdf".to_string(),
            created_at: "2024-01-01 00:00:00".to_string(),
            location: FileLocation::Trashed {
                trash_id: 2,
                from_folder_id: 3,
            },
        };
        let json = serde_json::to_value(FileResponse::from(&file)).unwrap();
        assert_eq!(json["folder_id"], 2);
        assert_eq!(json["location"]["state"], "trashed");
        assert_eq!(json["location"]["from_folder_id"], 3);
        assert!(json.get("blob_handle").is_none());
    }
}
