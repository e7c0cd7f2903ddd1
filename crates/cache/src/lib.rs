//! SQLite cache of the remote catalog.
//!
//! The database is not the source of truth, the remote site is. If the
//! database is deleted, browsing simply starts from an empty cache again.
//!
//! # Architecture
//! The cache stores three kinds of state:
//! - **Listings**: the rows of every fetched page, grouped by scope (a
//!   category, plus the query for searches). Identifiers are unique within a
//!   scope.
//! - **Details**: one record per identifier, shared across scopes. Created as
//!   a placeholder when a listing row is first seen, filled in lazily.
//! - **Cursors**: how many pages of each category have been consumed.

mod db;
pub mod error;
mod models;
mod repo;
mod store;

use std::sync::Arc;

pub use crate::db::Database;
pub use crate::repo::Repository;
pub use crate::store::{CacheStore, ListingStream};

pub type StoreHandle = Arc<dyn CacheStore + Send + Sync>;
