//! API handlers.

pub mod auth;
pub mod file;
pub mod folder;

use std::sync::Arc;

use crate::db::Database;
use crate::file::FileService;

use super::middleware::JwtState;

pub use auth::*;
pub use file::*;
pub use folder::*;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database handle.
    pub db: Database,
    /// File lifecycle service.
    pub files: Arc<FileService>,
    /// Access token issuer.
    pub jwt: Arc<JwtState>,
    /// Refresh token lifetime in days.
    pub refresh_token_expiry_days: u64,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        db: Database,
        files: Arc<FileService>,
        jwt: Arc<JwtState>,
        refresh_token_expiry_days: u64,
    ) -> Self {
        Self {
            db,
            files,
            jwt,
            refresh_token_expiry_days,
        }
    }
}
