//! API error handling.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;

use crate::FilecabError;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed request (400).
    BadRequest,
    /// Field-level validation failure (400).
    ValidationError,
    /// Missing or invalid credentials (401).
    Unauthorized,
    /// Not allowed (403).
    Forbidden,
    /// Not found (404).
    NotFound,
    /// Stale update or duplicate (409).
    Conflict,
    /// Resource in the wrong state (412).
    PreconditionFailed,
    /// Upload larger than the limit (413).
    PayloadTooLarge,
    /// Rate limit exceeded (429).
    TooManyRequests,
    /// Internal server error (500).
    InternalError,
    /// Blob store failure (502).
    UpstreamFailure,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest | ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::UpstreamFailure => StatusCode::BAD_GATEWAY,
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error details.
    pub error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Field-level validation messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Vec<String>>>,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    details: Option<HashMap<String, Vec<String>>>,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Create a validation error from validator::ValidationErrors.
    pub fn from_validation_errors(errors: validator::ValidationErrors) -> Self {
        let mut details: HashMap<String, Vec<String>> = HashMap::new();

        for (field, field_errors) in errors.field_errors() {
            let messages = field_errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {field}"))
                })
                .collect();
            details.insert(field.to_string(), messages);
        }

        Self {
            code: ErrorCode::ValidationError,
            message: "Validation failed".to_string(),
            details: Some(details),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<FilecabError> for ApiError {
    fn from(err: FilecabError) -> Self {
        match err {
            FilecabError::Auth(msg) => ApiError::unauthorized(msg),
            FilecabError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            FilecabError::Validation(msg) => ApiError::new(ErrorCode::ValidationError, msg),
            FilecabError::Permission(msg) => ApiError::forbidden(msg),
            FilecabError::Precondition(msg) => ApiError::new(ErrorCode::PreconditionFailed, msg),
            FilecabError::Conflict(msg) => ApiError::conflict(msg),
            err @ (FilecabError::Upstream(_) | FilecabError::UploadFailed { .. }) => {
                ApiError::new(ErrorCode::UpstreamFailure, err.to_string())
            }
            err => {
                tracing::error!(error = %err, "Internal error");
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::new(ErrorCode::PayloadTooLarge, "upload exceeds the size limit");
        }
        ApiError::bad_request(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status() {
        let cases = [
            (ErrorCode::BadRequest, StatusCode::BAD_REQUEST),
            (ErrorCode::ValidationError, StatusCode::BAD_REQUEST),
            (ErrorCode::Unauthorized, StatusCode::UNAUTHORIZED),
            (ErrorCode::Forbidden, StatusCode::FORBIDDEN),
            (ErrorCode::NotFound, StatusCode::NOT_FOUND),
            (ErrorCode::Conflict, StatusCode::CONFLICT),
            (ErrorCode::PreconditionFailed, StatusCode::PRECONDITION_FAILED),
            (ErrorCode::PayloadTooLarge, StatusCode::PAYLOAD_TOO_LARGE),
            (ErrorCode::TooManyRequests, StatusCode::TOO_MANY_REQUESTS),
            (ErrorCode::InternalError, StatusCode::INTERNAL_SERVER_ERROR),
            (ErrorCode::UpstreamFailure, StatusCode::BAD_GATEWAY),
        ];
        for (code, status) in cases {
            assert_eq!(code.status_code(), status, "{code:?}");
        }
    }

    #[test]
    fn test_domain_error_mapping() {
        let cases = [
            (FilecabError::Auth("x".into()), ErrorCode::Unauthorized),
            (FilecabError::NotFound("file".into()), ErrorCode::NotFound),
            (FilecabError::Validation("x".into()), ErrorCode::ValidationError),
            (FilecabError::Permission("x".into()), ErrorCode::Forbidden),
            (FilecabError::Precondition("x".into()), ErrorCode::PreconditionFailed),
            (FilecabError::Conflict("x".into()), ErrorCode::Conflict),
            (FilecabError::Upstream("x".into()), ErrorCode::UpstreamFailure),
            (
                FilecabError::UploadFailed {
                    attempts: 3,
                    reason: "503".into(),
                },
                ErrorCode::UpstreamFailure,
            ),
            (FilecabError::Database("x".into()), ErrorCode::InternalError),
        ];
        for (err, code) in cases {
            assert_eq!(ApiError::from(err).code(), code);
        }
    }

    #[test]
    fn test_internal_message_hidden() {
        let err = ApiError::from(FilecabError::Database("secret table".into()));
        assert!(!err.message().contains("secret"));
    }

    #[test]
    fn test_upload_failed_message_mentions_attempts() {
        let err = ApiError::from(FilecabError::UploadFailed {
            attempts: 3,
            reason: "503".into(),
        });
        assert!(err.message().contains("3 attempt"));
    }
}
