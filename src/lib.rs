//! filecab - a multi-user file cabinet.
//!
//! Users keep files in folders of their own. Every account has two reserved
//! folders: "All Files", a flattened view of everything active, and "Trash",
//! which holds deleted files until they are restored or purged. File contents
//! live in a blob store; the database only tracks metadata.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use auth::{
    authenticate, hash_password, register, validate_password, verify_password, LoginError,
    PasswordError, RegistrationError, RegistrationRequest, ValidationError,
};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{FilecabError, Result};
pub use file::{
    BlobStore, FileLocation, FileRecord, FileService, Folder, LocalBlobStore, RetryPolicy,
    RetryingBlobStore, StagingArea,
};
pub use web::WebServer;
