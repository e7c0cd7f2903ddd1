//! The storage contract the synchronizer is written against.

use std::pin::Pin;

use async_trait::async_trait;
use dytt_extract::models::{CategoryKey, DetailRecord, ListingRecord, Scope};
use futures::Stream;

use crate::error::Result;

/// Snapshots of one scope's listing: the current one first, then a fresh one
/// after every write to that scope.
pub type ListingStream = Pin<Box<dyn Stream<Item = Result<Vec<ListingRecord>>> + Send + 'static>>;

/// Durable storage for listing records, detail records and pagination
/// cursors.
///
/// The store is a read-through cache of remote content: every write replaces
/// what the remote said before, nothing is ever authored locally.
///
/// # Examples
///
/// ```
/// use dytt_cache::{CacheStore, Database, Repository};
/// use dytt_extract::models::{CategoryKey, Scope};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let db = Database::connect_in_memory().await?;
/// let store = Repository::from(&db);
/// let scope = Scope::category(CategoryKey::China);
/// assert!(store.read_listing(&scope).await?.is_empty());
/// assert_eq!(store.read_cursor(CategoryKey::China).await?, 0);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// The records of `scope`, in page order, then in the order the page
    /// listed them.
    async fn read_listing(&self, scope: &Scope) -> Result<Vec<ListingRecord>>;

    /// Observe the records of `scope` (see [`ListingStream`]).
    fn observe_listing(&self, scope: Scope) -> ListingStream;

    /// Persist one fetched page of `scope`, atomically.
    ///
    /// - The default page of the category replaces the whole scope.
    /// - Any later page replaces only the rows previously stored for that
    ///   page; rows listed again are moved to it.
    async fn write_listing(&self, scope: &Scope, page: u32, records: &[ListingRecord]) -> Result<()>;

    /// Insert a placeholder [`DetailRecord`] for each listing record, unless
    /// a filled record already exists for its id.
    async fn write_placeholders(&self, records: &[ListingRecord]) -> Result<()>;

    async fn read_detail(&self, id: u64) -> Result<Option<DetailRecord>>;

    async fn write_detail(&self, record: &DetailRecord) -> Result<()>;

    /// The detail records (filled or not) of every listing record of `scope`,
    /// in listing order.
    async fn read_details(&self, scope: &Scope) -> Result<Vec<DetailRecord>>;

    /// Pages consumed for `category`; `0` if none.
    async fn read_cursor(&self, category: CategoryKey) -> Result<u32>;

    async fn write_cursor(&self, category: CategoryKey, page: u32) -> Result<()>;
}
