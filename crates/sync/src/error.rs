//! Synchronization Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Errors of the collaborating crates
//! are raised into this crate's [`ErrorKind`], keeping their own frames as
//! children of the error tree.

use derive_more::{Display, Error};
use dytt_cache::error::{Error as CacheError, ErrorKind as CacheErrorKind};
use dytt_extract::error::{Error as ExtractError, ErrorKind as ExtractErrorKind};
use dytt_remote::error::{Error as RemoteError, ErrorKind as RemoteErrorKind};

/// A synchronization error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for synchronization operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// Cloneable, since every subscriber of a resolution receives its own copy
/// (see [`Failure`](crate::Failure)).
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The remote served something that is not the expected page.
    #[display("page extraction failed: {_0}")]
    Extract(ExtractErrorKind),
    /// The remote could not be fetched from.
    #[display("remote fetch failed: {_0}")]
    Remote(RemoteErrorKind),
    /// The local cache could not be read or written.
    #[display("cache access failed: {_0}")]
    Cache(CacheErrorKind),
    /// The pagination cursor moved while the page was in flight (a refresh,
    /// or a query change, got there first). Nothing was persisted.
    #[display("pagination cursor moved while the page was in flight")]
    CursorMoved,
    /// The listing has no such page (e.g. the home page has only one).
    #[display("no page {page} for {scope}")]
    NoSuchPage { scope: String, page: u32 },
    /// No listing ever mentioned this video, so there is nothing to fetch.
    #[display("unknown video: {_0}")]
    UnknownVideo(#[error(not(source))] u64),
    /// The resolution task died before reaching a terminal state.
    #[display("resolution aborted")]
    Aborted,
}

impl ErrorKind {
    /// Convert an extraction error, preserving the extract crate's `Exn`
    /// frame as a child in this error tree.
    #[track_caller]
    pub fn extract(err: ExtractError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Extract(inner))
    }

    /// Convert a remote error, preserving its `Exn` frame.
    #[track_caller]
    pub fn remote(err: RemoteError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Remote(inner))
    }

    /// Convert a cache error, preserving its `Exn` frame.
    #[track_caller]
    pub fn cache(err: CacheError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Cache(inner))
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Extract(kind) => kind.is_retryable(),
            Self::Remote(kind) => kind.is_retryable(),
            Self::Cache(kind) => kind.is_retryable(),
            Self::CursorMoved | Self::Aborted => true,
            Self::NoSuchPage { .. } | Self::UnknownVideo(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::Remote(RemoteErrorKind::Http(500)), true)]
    #[case(ErrorKind::Remote(RemoteErrorKind::Http(404)), false)]
    #[case(ErrorKind::Extract(ExtractErrorKind::InvalidDocument("category")), false)]
    #[case(ErrorKind::CursorMoved, true)]
    #[case(ErrorKind::UnknownVideo(1), false)]
    fn test_is_retryable(#[case] kind: ErrorKind, #[case] expected: bool) {
        assert_eq!(kind.is_retryable(), expected);
    }

    #[test]
    fn test_raise_keeps_kind() {
        let err = exn::Exn::from(RemoteErrorKind::Timeout);
        let raised = ErrorKind::remote(err);
        assert_eq!(*raised, ErrorKind::Remote(RemoteErrorKind::Timeout));
    }
}
