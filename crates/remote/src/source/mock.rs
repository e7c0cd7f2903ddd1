//! In-memory remote source for testing.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{RwLock, watch};

use super::RemoteSource;
use crate::error::{ErrorKind, Result};

#[derive(Debug, Clone)]
enum Reply {
    Page(Vec<u8>),
    Failure(ErrorKind),
}

/// In-memory remote source for testing.
///
/// Pages and failures are keyed by the exact path passed to
/// [`fetch`](RemoteSource::fetch); unknown paths answer `Http(404)`. Every
/// fetch is counted *before* it waits on the gate, so tests can observe
/// requests that are still in flight.
///
/// # Examples
///
/// ```
/// use dytt_remote::RemoteSource;
/// use dytt_remote::error::ErrorKind;
/// use dytt_remote::source::MockSource;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let source = MockSource::default()
///     .with_page("/", b"<html></html>")
///     .with_failure("/html/gndy/china", ErrorKind::Http(500));
///
/// assert_eq!(source.fetch("/").await.unwrap(), b"<html></html>");
/// assert_eq!(*source.fetch("/html/gndy/china").await.unwrap_err(), ErrorKind::Http(500));
/// assert_eq!(source.fetch_count("/").await, 1);
/// # }
/// ```
pub struct MockSource {
    name: String,
    replies: RwLock<HashMap<String, Reply>>,
    fetches: RwLock<HashMap<String, usize>>,
    gate: watch::Sender<bool>,
}
impl MockSource {
    /// Change the name of the mock source.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Serve `body` at `path`.
    pub fn with_page(mut self, path: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.replies.get_mut().insert(path.into(), Reply::Page(body.into()));
        self
    }

    /// Fail every fetch of `path` with `kind`.
    pub fn with_failure(mut self, path: impl Into<String>, kind: ErrorKind) -> Self {
        self.replies.get_mut().insert(path.into(), Reply::Failure(kind));
        self
    }

    /// Serve `body` at `path` from now on, replacing any previous reply.
    pub async fn set_page(&self, path: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.replies.write().await.insert(path.into(), Reply::Page(body.into()));
    }

    /// Fail every fetch of `path` with `kind` from now on.
    pub async fn set_failure(&self, path: impl Into<String>, kind: ErrorKind) {
        self.replies.write().await.insert(path.into(), Reply::Failure(kind));
    }

    /// How many times `path` has been fetched (including fetches still
    /// waiting on the gate).
    pub async fn fetch_count(&self, path: &str) -> usize {
        self.fetches.read().await.get(path).copied().unwrap_or_default()
    }

    /// Total number of fetches, across all paths.
    pub async fn total_fetches(&self) -> usize {
        self.fetches.read().await.values().sum()
    }

    /// Hold every subsequent fetch until [`release`](Self::release) is called.
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    /// Let held fetches (and all future ones) through.
    pub fn release(&self) {
        self.gate.send_replace(true);
    }
}
impl Default for MockSource {
    fn default() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            name: "mock".to_string(),
            replies: RwLock::new(HashMap::new()),
            fetches: RwLock::new(HashMap::new()),
            gate,
        }
    }
}

#[async_trait]
impl RemoteSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        *self.fetches.write().await.entry(path.to_string()).or_default() += 1;
        let mut gate = self.gate.subscribe();
        // The sender lives as long as `self`, so this cannot fail while we borrow it.
        if gate.wait_for(|open| *open).await.is_err() {
            exn::bail!(ErrorKind::Unreachable);
        }
        match self.replies.read().await.get(path).cloned() {
            Some(Reply::Page(body)) => Ok(body),
            Some(Reply::Failure(kind)) => exn::bail!(kind),
            None => exn::bail!(ErrorKind::Http(404)),
        }
    }
}
