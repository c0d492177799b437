use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{FormRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::config::ConfigError;

/// A specialized `Result` type for the process and its HTTP handlers.
pub type AppResult<T> = Result<T, AppError>;

/// Process-level error type.
///
/// Scale failures never reach this type; they are values in `UpdateResult`
/// and `ReadResult`. This covers startup and the plumbing around handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid listen address: {0}")]
    Address(#[from] std::net::AddrParseError),
    #[error("An I/O error occurred: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serial worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
    #[error("Invalid query string: {0}")]
    Query(#[from] QueryRejection),
    #[error("Invalid form body: {0}")]
    Form(#[from] FormRejection),
    #[error("Invalid multipart body: {0}")]
    MultipartBody(#[from] MultipartRejection),
    #[error("Invalid multipart field: {0}")]
    MultipartField(#[from] MultipartError),
}

impl AppError {
    fn error_type(&self) -> &'static str {
        match self {
            Self::Config(_) => "ConfigError",
            Self::Address(_) => "AddressError",
            Self::Io(_) => "IoError",
            Self::Worker(_) => "WorkerError",
            Self::Query(_) | Self::Form(_) | Self::MultipartBody(_) | Self::MultipartField(_) => {
                "BadRequest"
            }
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Query(e) => e.status(),
            Self::Form(e) => e.status(),
            Self::MultipartBody(e) => e.status(),
            Self::MultipartField(e) => e.status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Allows Axum to convert `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = axum::Json(json!({
            "status": "error",
            "error": { "type": self.error_type(), "message": self.to_string() }
        }));
        (status, body).into_response()
    }
}
