//! HTTP error responses.
//!
//! Every handler returns `Result<_, ApiError>`. The variant decides the
//! status code; the body is always an [`ErrorBody`] (`{message, errors?}`).
//! Internal failures are logged here and reported to the caller without
//! detail.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use taskdeck_proto::api::ErrorBody;
use taskdeck_proto::input::{FieldError, ValidationError};

use crate::accounts::AccountError;
use crate::store::StoreError;

/// An error surfaced to an HTTP caller.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// One or more fields were rejected.
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// The request was malformed in a way that has no field breakdown.
    #[error("{0}")]
    BadRequest(String),

    /// The request body exceeded the configured limit.
    #[error("Request body too large")]
    PayloadTooLarge,

    /// The task is absent or not the caller's.
    #[error("Task not found")]
    TaskNotFound,

    /// No valid bearer token was presented.
    #[error("Authentication required")]
    Unauthorized,

    /// Something failed on our side.
    #[error("Server error")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::TaskNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(self) -> ErrorBody {
        match self {
            Self::Validation(errors) => ErrorBody {
                message: "Validation failed".to_string(),
                errors: Some(errors),
            },
            Self::BadRequest(message) => ErrorBody::message(message),
            Self::PayloadTooLarge | Self::TaskNotFound | Self::Unauthorized | Self::Internal(_) => {
                ErrorBody::message(self.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let Self::Internal(detail) = &self {
            tracing::error!(error = %detail, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(error: ValidationError) -> Self {
        Self::Validation(error.errors)
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => Self::TaskNotFound,
            StoreError::Snapshot(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(error: AccountError) -> Self {
        match error {
            AccountError::Validation(e) => e.into(),
            AccountError::EmailTaken | AccountError::InvalidCredentials => {
                Self::BadRequest(error.to_string())
            }
            AccountError::Snapshot(e) => Self::Internal(e.to_string()),
            AccountError::Hashing(detail) => Self::Internal(detail),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::PayloadTooLarge;
        }
        match rejection {
            JsonRejection::BytesRejection(_) => {
                Self::BadRequest("Request body could not be read".to_string())
            }
            other => Self::Validation(vec![FieldError::new("body", other.body_text())]),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(vec![FieldError::new("query", rejection.body_text())])
    }
}
