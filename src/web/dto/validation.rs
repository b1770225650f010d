//! Request body extraction with validation.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use crate::web::error::ApiError;

/// JSON body that has passed its `validator` rules.
///
/// A body that is not JSON, or does not match the DTO, is `BAD_REQUEST`.
/// A well-formed body that breaks a rule is `VALIDATION_ERROR` with the
/// failing fields listed in `details`.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_to_error)?;

        value.validate().map_err(ApiError::from_validation_errors)?;
        Ok(ValidatedJson(value))
    }
}

fn rejection_to_error(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::bad_request("Expected a JSON body (Content-Type: application/json)")
        }
        JsonRejection::JsonDataError(e) => {
            ApiError::bad_request(format!("Unexpected request body: {}", e.body_text()))
        }
        other => ApiError::bad_request(format!("Invalid JSON: {}", other.body_text())),
    }
}

/// A user-visible name: something left after trimming, on a single line.
pub fn display_name(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("Must not be empty".into()));
    }
    if value.chars().any(char::is_control) {
        return Err(ValidationError::new("control_chars")
            .with_message("Must not contain control characters".into()));
    }
    Ok(())
}
