pub mod error;
pub mod source;

use std::sync::Arc;

pub use crate::source::RemoteSource;

pub type SourceHandle = Arc<dyn RemoteSource + Send + Sync>;
