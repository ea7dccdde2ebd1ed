//! Control-plane error types.

use crate::status;
use thiserror::Error;

/// Errors returned by [`ApiClient`](crate::ApiClient) calls.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} with unparseable body")]
    HttpStatus { status: u16 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("platform error {code}: {description} ({hint})")]
    Status {
        code: i64,
        description: &'static str,
        hint: &'static str,
    },

    #[error("response has no data for {0}")]
    MissingData(&'static str),

    #[error("invalid access secret")]
    InvalidSecret,
}

impl ApiError {
    /// Builds a [`ApiError::Status`] from a non-zero response code.
    pub fn from_code(code: i64) -> Self {
        let info = status::lookup(code);
        ApiError::Status {
            code,
            description: info.description,
            hint: info.hint,
        }
    }

    /// Platform status code, if the platform answered with one.
    pub fn code(&self) -> Option<i64> {
        match self {
            ApiError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}
