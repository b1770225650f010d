//! Authentication module for filecab.
//!
//! Password hashing, credential validation, registration and login.

mod password;
mod registration;
pub mod validation;

pub use password::{hash_password, verify_password, PasswordError};
pub use registration::{authenticate, register, LoginError, RegistrationError, RegistrationRequest};
pub use validation::{validate_password, validate_registration, validate_username, ValidationError};
