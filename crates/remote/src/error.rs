//! Remote Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A remote access error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for remote operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The remote did not answer in time.
    #[display("request timed out")]
    Timeout,
    /// The remote answered with a non-success status.
    #[display("remote answered with HTTP status {_0}")]
    Http(#[error(not(source))] u16),
    /// The remote could not be reached, or the response could not be read.
    #[display("remote unreachable")]
    Unreachable,
    /// The path cannot be resolved against the configured base.
    #[display("invalid path: {_0}")]
    InvalidPath(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Unreachable => true,
            Self::Http(status) => *status >= 500,
            Self::InvalidPath(_) => false,
        }
    }
}
