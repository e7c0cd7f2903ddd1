use std::pin::Pin;

use derive_more::Display;
use futures::{Stream, StreamExt};

use crate::error::{Error, ErrorKind};

/// Emissions of one resolution, as seen by one subscriber: at most one
/// [`Resource::Loading`], then exactly one terminal emission, then the end of
/// the stream.
pub type ResourceStream<T> = Pin<Box<dyn Stream<Item = Resource<T>> + Send + 'static>>;

/// Why a resolution ended in [`Resource::Error`].
#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display("{message}")]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}
impl Failure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
impl From<&Error> for Failure {
    fn from(err: &Error) -> Self {
        Self::new((**err).clone(), err.to_string())
    }
}
impl From<ErrorKind> for Failure {
    fn from(kind: ErrorKind) -> Self {
        let message = kind.to_string();
        Self::new(kind, message)
    }
}

/// State of a synchronized read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource<T> {
    /// A resolution is under way; carries what the cache had, if anything.
    Loading(Option<T>),
    /// The resolution completed; carries the cache's view after it.
    Success(T),
    /// The resolution failed; carries the last known data, if any, so that a
    /// failed refresh degrades to stale data rather than to nothing.
    Error { failure: Failure, data: Option<T> },
}
impl<T> Resource<T> {
    pub fn failed(failure: impl Into<Failure>, data: Option<T>) -> Self {
        Self::Error {
            failure: failure.into(),
            data,
        }
    }

    /// Whether this is the last emission of a resolution.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Loading(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Loading(data) | Self::Error { data, .. } => data.as_ref(),
            Self::Success(data) => Some(data),
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Loading(data) | Self::Error { data, .. } => data,
            Self::Success(data) => Some(data),
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Error { failure, .. } => Some(failure),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resource<U> {
        match self {
            Self::Loading(data) => Resource::Loading(data.map(f)),
            Self::Success(data) => Resource::Success(f(data)),
            Self::Error { failure, data } => Resource::Error {
                failure,
                data: data.map(f),
            },
        }
    }
}

/// Observe a resolution until its terminal emission, then detach from it.
///
/// Returns `None` only if the stream ended without one.
pub async fn settle<T>(mut stream: ResourceStream<T>) -> Option<Resource<T>> {
    while let Some(resource) = stream.next().await {
        if resource.is_terminal() {
            return Some(resource);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_is_kept_on_error() {
        let resource = Resource::failed(ErrorKind::CursorMoved, Some(vec![1, 2]));
        assert!(resource.is_terminal());
        assert_eq!(resource.data(), Some(&vec![1, 2]));
        assert_eq!(resource.failure().map(|f| &f.kind), Some(&ErrorKind::CursorMoved));
        assert_eq!(resource.map(|v| v.len()).into_data(), Some(2));
    }

    #[test]
    fn test_loading_is_not_terminal() {
        assert!(!Resource::<()>::Loading(None).is_terminal());
        assert!(Resource::Success(()).is_terminal());
    }

    #[tokio::test]
    async fn test_settle_skips_loading() {
        let stream: ResourceStream<u8> =
            Box::pin(futures::stream::iter([Resource::Loading(Some(1)), Resource::Success(2), Resource::Success(3)]));
        assert_eq!(settle(stream).await, Some(Resource::Success(2)));
        let empty: ResourceStream<u8> = Box::pin(futures::stream::iter([Resource::Loading(None)]));
        assert_eq!(settle(empty).await, None);
    }
}
