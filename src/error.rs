//! Error types for report management.

use thiserror::Error;

/// Errors raised by a backing store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Duplicate report: {0}")]
    Duplicate(String),

    #[error("Unknown report field: {0}")]
    UnknownField(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Request deadline exceeded")]
    DeadlineExceeded,

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Errors returned by [`crate::ReportRepository`].
#[derive(Error, Debug)]
pub enum ReportError {
    /// Malformed or missing input, detected before any store call.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A well-formed request affected zero rows where one was expected.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    StoreFailure(#[from] StoreError),
}

impl ReportError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub const fn is_store_failure(&self) -> bool {
        matches!(self, Self::StoreFailure(_))
    }
}
