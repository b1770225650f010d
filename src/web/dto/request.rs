//! Request DTOs for the Web API.

use serde::Deserialize;
use validator::Validate;

use super::validation::display_name;

/// Login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 32, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, max = 128, message = "Password is required"))]
    pub password: String,
}

/// User registration request.
///
/// Format rules live in `auth::validation`; this only rejects obviously
/// malformed bodies.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 32, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, max = 128, message = "Password is required"))]
    pub password: String,
}

/// Logout request.
#[derive(Debug, Deserialize, Validate)]
pub struct LogoutRequest {
    /// Refresh token to revoke.
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Token refresh request.
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Create a folder.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateFolderRequest {
    /// Folder name.
    #[validate(
        length(max = 100, message = "Folder name must be at most 100 characters"),
        custom(function = "display_name")
    )]
    pub name: String,
}

/// Rename a folder.
///
/// The name is checked by the file service, after it has established that
/// the folder may be renamed at all.
#[derive(Debug, Deserialize, Validate)]
pub struct RenameFolderRequest {
    /// New folder name.
    pub name: String,
}
