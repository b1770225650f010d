//! Credential store operations: registration and login.

use thiserror::Error;
use tracing::{debug, info};

use super::password::{hash_password, verify_password, PasswordError};
use super::validation::{validate_registration, ValidationError};
use crate::db::{NewUser, User, UserRepository};
use crate::FilecabError;

/// Registration-specific errors.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Validation failed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Username already exists.
    #[error("username already exists")]
    UsernameExists,

    /// Password hashing failed.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

/// Login errors.
#[derive(Error, Debug)]
pub enum LoginError {
    /// Unknown user or wrong password. The two are not distinguished.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

/// Registration request data.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    /// Desired username.
    pub username: String,
    /// Plaintext password.
    pub password: String,
}

impl RegistrationRequest {
    /// Create a new registration request.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Register a new user.
///
/// Validates the input, rejects taken usernames, hashes the password off the
/// async runtime and stores the user.
pub async fn register(
    repo: &UserRepository<'_>,
    request: RegistrationRequest,
) -> std::result::Result<User, RegistrationError> {
    validate_registration(&request.username, &request.password)?;

    if repo
        .username_exists(&request.username)
        .await
        .map_err(|e| RegistrationError::Database(e.to_string()))?
    {
        return Err(RegistrationError::UsernameExists);
    }

    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| PasswordError::HashError(e.to_string()))??;

    // A concurrent registration can still win the race; the unique index
    // reports it as a conflict.
    let user = repo
        .create(&NewUser::new(&request.username, password_hash))
        .await
        .map_err(|e| match e {
            FilecabError::Conflict(_) => RegistrationError::UsernameExists,
            other => RegistrationError::Database(other.to_string()),
        })?;

    info!(username = %user.username, user_id = user.id, "New user registered");
    Ok(user)
}

/// Check a username/password pair.
pub async fn authenticate(
    repo: &UserRepository<'_>,
    username: &str,
    password: &str,
) -> std::result::Result<User, LoginError> {
    let user = repo
        .get_by_username(username)
        .await
        .map_err(|e| LoginError::Database(e.to_string()))?
        .ok_or_else(|| {
            debug!(username, "Login for unknown user");
            LoginError::InvalidCredentials
        })?;

    let password = password.to_string();
    let hash = user.password.clone();
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| LoginError::Database(e.to_string()))?;

    if verified.is_err() {
        debug!(user_id = user.id, "Login with wrong password");
        return Err(LoginError::InvalidCredentials);
    }

    Ok(user)
}

impl From<RegistrationError> for FilecabError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Validation(e) => FilecabError::Validation(e.to_string()),
            RegistrationError::UsernameExists => {
                FilecabError::Conflict("username already exists".to_string())
            }
            RegistrationError::Password(PasswordError::TooShort | PasswordError::TooLong) => {
                FilecabError::Validation(err.to_string())
            }
            RegistrationError::Password(e) => FilecabError::Auth(e.to_string()),
            RegistrationError::Database(e) => FilecabError::Database(e),
        }
    }
}

impl From<LoginError> for FilecabError {
    fn from(err: LoginError) -> Self {
        match err {
            LoginError::InvalidCredentials => FilecabError::Auth(err.to_string()),
            LoginError::Database(e) => FilecabError::Database(e),
        }
    }
}
