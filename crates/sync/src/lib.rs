//! Synchronization of the local cache with the remote movie site.
//!
//! # Architecture
//! - [`Synchronizer`] resolves listings and detail records: cache read,
//!   remote fetch, extraction, persistence, cache re-read. Every resolution
//!   is a [`ResourceStream`].
//! - [`Coalescer`] keeps at most one resolution in flight per key and shares
//!   its emissions with every caller asking for that key.
//! - [`PaginationTracker`] owns the per-category "pages consumed" cursors.
//! - [`SearchSession`] turns free-text input into a two-stage resolution:
//!   the search listing, then the details of its rows.
//!
//! The cache, not this crate, owns every durable record. Nothing here holds
//! on to data past the end of a resolution.

mod coalesce;
pub mod error;
mod pagination;
mod resource;
mod search;
mod synchronizer;

pub use crate::coalesce::{Coalescer, Emitter};
pub use crate::pagination::{CursorGuard, PaginationTracker};
pub use crate::resource::{Failure, Resource, ResourceStream, settle};
pub use crate::search::SearchSession;
pub use crate::synchronizer::{Pagination, StalenessPolicy, SyncOptions, Synchronizer};
