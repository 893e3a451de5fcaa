//! Error types for the opening store.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("store rejected credentials")]
    Unauthorized,

    #[error("store returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("store reply malformed: {0}")]
    Malformed(String),

    #[error("stored record malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Stable short label, carried by `Lookup::Unknown` and the audit log.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Http(_)        => "http",
            StoreError::Timeout(_)     => "timeout",
            StoreError::Unauthorized   => "unauthorized",
            StoreError::Status { .. }  => "status",
            StoreError::Malformed(_)   => "malformed_reply",
            StoreError::Json(_)        => "malformed_record",
            StoreError::Unavailable(_) => "unavailable",
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
