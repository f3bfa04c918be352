use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, UpdropError>;

/// Structured error types for everything the upload pipeline can hit.
#[derive(Error, Debug)]
pub enum UpdropError {
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("{service} is not configured: {hint}")]
    MissingCredentials {
        service: &'static str,
        hint: &'static str,
    },

    #[error("{service} rejected the upload: {message}")]
    ServiceError {
        service: &'static str,
        message: String,
    },

    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("upload cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for unexpected errors with full context attached
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
