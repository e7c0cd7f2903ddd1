//! Remote source trait and implementations.
//!
//! A [`RemoteSource`] is the only way pages get into the application: it
//! turns a path (relative to the site, or an absolute URL for hosts other
//! than the main site) into the raw bytes of the page, in whatever encoding
//! the remote serves them.

#[cfg(feature = "http")]
mod http;
#[cfg(feature = "mock")]
mod mock;

use async_trait::async_trait;

#[cfg(feature = "http")]
pub use self::http::HttpSource;
#[cfg(feature = "mock")]
pub use self::mock::MockSource;
use crate::error::Result;

/// Unified interface for fetching remote pages.
///
/// Implementations must be safe to call concurrently; deduplication of
/// identical in-flight requests is the caller's business, not the source's.
///
/// # Examples
///
/// ```
/// use dytt_remote::{RemoteSource, error::Result};
///
/// async fn page_size(source: &dyn RemoteSource) -> Result<usize> {
///     Ok(source.fetch("/html/gndy/new_movie").await?.len())
/// }
/// ```
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Name of the source, used for logging only.
    fn name(&self) -> &str;

    /// Fetch the raw bytes of the page at `path`.
    ///
    /// # Errors
    ///
    /// - [`Timeout`](crate::error::ErrorKind::Timeout) and
    ///   [`Unreachable`](crate::error::ErrorKind::Unreachable) for transport
    ///   failures
    /// - [`Http`](crate::error::ErrorKind::Http) for non-success statuses
    /// - [`InvalidPath`](crate::error::ErrorKind::InvalidPath) if the path
    ///   cannot be turned into a request at all
    async fn fetch(&self, path: &str) -> Result<Vec<u8>>;
}
