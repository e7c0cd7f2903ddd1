//! Configuration Error Types

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration loading.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// None of these are retryable: the configuration has to be fixed first.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An explicitly requested configuration file does not exist.
    #[display("configuration file not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// The configuration file extension is not one of `toml`, `yaml`, `yml`
    /// or `json`.
    #[display("unsupported configuration format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// A layer could not be read, or does not have the expected shape.
    #[display("invalid configuration")]
    Invalid,
    /// A value was read but is out of range.
    #[display("invalid value for {field}: {reason}")]
    Validation { field: &'static str, reason: &'static str },
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        false
    }
}
