use crate::services::{
    session_service::SessionError, storage_service::StorageError, upload_service::UploadError,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Missing | SessionError::Invalid => {
                AppError::new(StatusCode::UNAUTHORIZED, err.to_string())
            }
            SessionError::Sqlx(_) => AppError::internal(err.to_string()),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ObjectNotFound { .. } => AppError::not_found(err.to_string()),
            StorageError::InvalidObjectKey => AppError::bad_request(err.to_string()),
            StorageError::ObjectExists { .. } => AppError::new(StatusCode::CONFLICT, err.to_string()),
            StorageError::Sqlx(_) | StorageError::Io(_) => AppError::internal(err.to_string()),
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Session(inner) => inner.into(),
            UploadError::InvalidBucket(_)
            | UploadError::MissingField(_)
            | UploadError::InvalidImageKind(_)
            | UploadError::ImageKindMismatch { .. }
            | UploadError::FileTooLarge { .. }
            | UploadError::UnsupportedContentType(_)
            | UploadError::InvalidEntityId(_) => AppError::bad_request(err.to_string()),
            UploadError::NotAuthorized => AppError::new(StatusCode::FORBIDDEN, err.to_string()),
            UploadError::Lookup(_) | UploadError::Storage(_) | UploadError::RecordUpdate(_) => {
                AppError::internal(err.to_string())
            }
        }
    }
}
