//! Resolve-from-cache-or-fetch for listings and detail records.

use std::sync::Arc;

use dytt_cache::StoreHandle;
use dytt_cache::error::ErrorKind as CacheErrorKind;
use dytt_extract::models::{DetailRecord, ListingRecord, Scope};
use dytt_extract::{parse_detail, parse_listing};
use dytt_remote::SourceHandle;
use exn::{OptionExt, ResultExt};
use futures::StreamExt;
use tokio::task::spawn_blocking;
use tracing::{debug, instrument, warn};

use crate::coalesce::{Coalescer, Emitter};
use crate::error::{ErrorKind, Result};
use crate::pagination::PaginationTracker;
use crate::resource::{Resource, ResourceStream, settle};

const DEFAULT_DETAIL_CONCURRENCY: usize = 4;

/// When cached listing data is good enough to skip the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StalenessPolicy {
    /// The cache is a first paint; every resolution fetches.
    #[default]
    Always,
    /// A non-empty cache is sufficient, unless a refresh is requested.
    WhenEmpty,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub staleness: StalenessPolicy,
    /// How many detail pages a scoped detail resolution fetches at once.
    pub detail_concurrency: usize,
}
impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            staleness: StalenessPolicy::default(),
            detail_concurrency: DEFAULT_DETAIL_CONCURRENCY,
        }
    }
}

/// Which page of a scope a resolution is after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pagination {
    /// The default page; replaces the whole scope.
    First,
    /// The page after the last one consumed.
    Next,
}

/// The scope, the page, and whether the resolution fetches whatever the
/// cache holds. A forced resolution never joins one the cache may satisfy.
type ListingKey = (Scope, Pagination, bool);
type Listings = Vec<ListingRecord>;
type Details = Vec<DetailRecord>;

struct Inner {
    remote: SourceHandle,
    store: StoreHandle,
    tracker: PaginationTracker,
    options: SyncOptions,
    listings: Coalescer<ListingKey, Listings>,
    details: Coalescer<u64, DetailRecord>,
    scoped_details: Coalescer<ListingKey, Details>,
}

/// Reconciles the cache with the remote site.
///
/// Every read returns a [`ResourceStream`]: the cached view as
/// [`Resource::Loading`], then the cache's view after the remote was
/// consulted as [`Resource::Success`], or the failure along with the last
/// known data as [`Resource::Error`]. Concurrent reads of the same thing
/// share one resolution.
///
/// Cheap to clone; clones share their in-flight resolutions.
#[derive(Clone)]
pub struct Synchronizer {
    inner: Arc<Inner>,
}

impl Synchronizer {
    pub fn new(remote: SourceHandle, store: StoreHandle, options: SyncOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                remote,
                tracker: PaginationTracker::new(Arc::clone(&store)),
                store,
                options,
                listings: Coalescer::default(),
                details: Coalescer::default(),
                scoped_details: Coalescer::default(),
            }),
        }
    }

    pub fn tracker(&self) -> &PaginationTracker {
        &self.inner.tracker
    }

    pub fn store(&self) -> &StoreHandle {
        &self.inner.store
    }

    pub fn options(&self) -> &SyncOptions {
        &self.inner.options
    }

    /// Resolve the default page of `scope`.
    ///
    /// With `refresh`, the remote is consulted whatever the staleness policy
    /// says.
    pub async fn listing(&self, scope: Scope, refresh: bool) -> ResourceStream<Listings> {
        self.resolve_listing(scope, Pagination::First, refresh).await
    }

    /// Resolve the page after the last one consumed for the category of
    /// `scope`. The emitted data is the whole scope, not only the new page.
    pub async fn load_more(&self, scope: Scope) -> ResourceStream<Listings> {
        self.resolve_listing(scope, Pagination::Next, true).await
    }

    /// Resolve one detail record, fetching its page only if the cached record
    /// is a placeholder.
    pub async fn detail(&self, id: u64) -> ResourceStream<DetailRecord> {
        let this = self.clone();
        self.inner
            .details
            .resolve(id, move |emitter| async move { this.run_detail(emitter, id).await })
            .await
    }

    /// Resolve the default page of `scope`, then fill in the detail records
    /// of every row of the scope.
    pub async fn details(&self, scope: Scope, refresh: bool) -> ResourceStream<Details> {
        self.resolve_details(scope, Pagination::First, refresh).await
    }

    /// Like [`details`](Self::details), for the next page of `scope`.
    pub async fn more_details(&self, scope: Scope) -> ResourceStream<Details> {
        self.resolve_details(scope, Pagination::Next, true).await
    }

    /// Whether a resolution consults the remote even if the cache has data.
    fn forces_fetch(&self, pagination: Pagination, refresh: bool) -> bool {
        refresh || pagination == Pagination::Next || self.inner.options.staleness == StalenessPolicy::Always
    }

    async fn resolve_listing(&self, scope: Scope, pagination: Pagination, refresh: bool) -> ResourceStream<Listings> {
        let forced = self.forces_fetch(pagination, refresh);
        let this = self.clone();
        self.inner
            .listings
            .resolve((scope.clone(), pagination, forced), move |emitter| async move {
                this.run_listing(emitter, scope, pagination, forced).await
            })
            .await
    }

    async fn resolve_details(&self, scope: Scope, pagination: Pagination, refresh: bool) -> ResourceStream<Details> {
        let forced = self.forces_fetch(pagination, refresh);
        let this = self.clone();
        self.inner
            .scoped_details
            .resolve((scope.clone(), pagination, forced), move |emitter| async move {
                this.run_details(emitter, scope, pagination, forced).await
            })
            .await
    }

    #[instrument(skip_all, fields(%scope, ?pagination, forced))]
    async fn run_listing(
        &self,
        mut emitter: Emitter<ListingKey, Listings>,
        scope: Scope,
        pagination: Pagination,
        forced: bool,
    ) -> Resource<Listings> {
        let cached = match self.cached_listing(&scope).await {
            Ok(cached) => cached,
            Err(err) => {
                emitter.loading(None).await;
                return Resource::failed(&err, None);
            },
        };
        debug!(cached = cached.as_ref().map_or(0, Vec::len), "cache read");
        emitter.loading(cached.clone()).await;

        if let Some(records) = &cached
            && !forced
        {
            debug!("cached listing is fresh enough");
            return Resource::Success(records.clone());
        }

        let outcome = match self.fetch_listing(&scope, pagination).await {
            Ok(()) => self.cached_listing(&scope).await,
            Err(err) => Err(err),
        };
        match outcome {
            Ok(records) => Resource::Success(records.unwrap_or_default()),
            Err(err) => {
                warn!(error = %err, cached = cached.is_some(), "listing resolution failed");
                Resource::failed(&err, cached)
            },
        }
    }

    /// Fetch, extract and persist one page of `scope`, then move the cursor.
    async fn fetch_listing(&self, scope: &Scope, pagination: Pagination) -> Result<()> {
        let category = scope.category;
        let default_page = category.default_page();
        let (consumed, generation) = {
            let cursor = self.inner.tracker.lock(category).await;
            (cursor.current().await?, cursor.generation())
        };
        let page = match pagination {
            Pagination::First => default_page,
            Pagination::Next => default_page.saturating_add(consumed),
        };
        let path = scope.path(page).ok_or_raise(|| ErrorKind::NoSuchPage {
            scope: scope.to_string(),
            page,
        })?;

        debug!(page, %path, "fetching listing page");
        let markup = self.inner.remote.fetch(&path).await.map_err(ErrorKind::remote)?;
        let records = spawn_blocking(move || parse_listing(markup, category))
            .await
            .or_raise(|| ErrorKind::Aborted)?
            .map_err(ErrorKind::extract)?;
        debug!(page, records = records.len(), "listing page extracted");

        // Persisting and moving the cursor happen under the cursor lock, so
        // the cursor never runs ahead of what is stored.
        let mut cursor = self.inner.tracker.lock(category).await;
        if pagination == Pagination::Next && (cursor.current().await? != consumed || cursor.generation() != generation) {
            exn::bail!(ErrorKind::CursorMoved);
        }
        if records.is_empty() && page > default_page {
            debug!(page, "no rows past the last page");
            return Ok(());
        }
        self.inner.store.write_listing(scope, page, &records).await.map_err(ErrorKind::cache)?;
        self.inner.store.write_placeholders(&records).await.map_err(ErrorKind::cache)?;
        if page == default_page {
            cursor.reset().await?;
        }
        cursor.advance().await?;
        Ok(())
    }

    /// The first snapshot of the cache's observable view of `scope`; `None`
    /// when the scope is empty.
    async fn cached_listing(&self, scope: &Scope) -> Result<Option<Listings>> {
        match self.inner.store.observe_listing(scope.clone()).next().await {
            Some(Ok(records)) => Ok((!records.is_empty()).then_some(records)),
            Some(Err(err)) => Err(ErrorKind::cache(err)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, emitter))]
    async fn run_detail(&self, mut emitter: Emitter<u64, DetailRecord>, id: u64) -> Resource<DetailRecord> {
        let cached = match self.inner.store.read_detail(id).await {
            Ok(cached) => cached,
            Err(err) => {
                emitter.loading(None).await;
                return Resource::failed(&ErrorKind::cache(err), None);
            },
        };
        emitter.loading(cached.clone()).await;

        let Some(placeholder) = cached else {
            debug!("no listing ever mentioned this video");
            return Resource::failed(ErrorKind::UnknownVideo(id), None);
        };
        if placeholder.is_filled() {
            debug!("cached detail is complete");
            return Resource::Success(placeholder);
        }
        match self.fill_detail(&placeholder).await {
            Ok(record) => Resource::Success(record),
            Err(err) => {
                warn!(error = %err, "detail resolution failed");
                Resource::failed(&err, Some(placeholder))
            },
        }
    }

    async fn fill_detail(&self, placeholder: &DetailRecord) -> Result<DetailRecord> {
        let id = placeholder.id;
        debug!(link = %placeholder.link, "fetching detail page");
        let markup = self.inner.remote.fetch(&placeholder.link).await.map_err(ErrorKind::remote)?;
        let link = placeholder.link.clone();
        let mut record = spawn_blocking(move || parse_detail(markup, &link))
            .await
            .or_raise(|| ErrorKind::Aborted)?
            .map_err(ErrorKind::extract)?;
        // The listing row knows things the detail page does not always repeat.
        if record.title.is_empty() {
            record.title = placeholder.title.clone();
        }
        record.published = record.published.or(placeholder.published);
        record.id = id;

        self.inner.store.write_detail(&record).await.map_err(ErrorKind::cache)?;
        self.inner
            .store
            .read_detail(id)
            .await
            .map_err(ErrorKind::cache)?
            .ok_or_raise(|| ErrorKind::Cache(CacheErrorKind::NotFound(format!("detail {id}"))))
    }

    #[instrument(skip_all, fields(%scope, ?pagination, forced))]
    async fn run_details(
        &self,
        mut emitter: Emitter<ListingKey, Details>,
        scope: Scope,
        pagination: Pagination,
        forced: bool,
    ) -> Resource<Details> {
        let cached = match self.cached_details(&scope).await {
            Ok(cached) => cached,
            Err(err) => {
                emitter.loading(None).await;
                return Resource::failed(&err, None);
            },
        };
        emitter.loading(cached.clone()).await;

        // Stage one: the listing of the scope, observed to its terminal
        // emission and then let go of.
        let listing = match pagination {
            Pagination::First => self.listing(scope.clone(), forced).await,
            Pagination::Next => self.load_more(scope.clone()).await,
        };
        match settle(listing).await {
            Some(Resource::Error { failure, .. }) => {
                warn!(%failure, "listing resolution failed, details not filled");
                let data = self.cached_details(&scope).await.ok().flatten().or(cached);
                return Resource::failed(failure, data);
            },
            None => return Resource::failed(ErrorKind::Aborted, cached),
            Some(_) => {},
        }

        // Stage two: fill in every placeholder of the scope.
        let records = match self.cached_details(&scope).await {
            Ok(records) => records.unwrap_or_default(),
            Err(err) => return Resource::failed(&err, cached),
        };
        let unfilled: Vec<u64> = records.iter().filter(|r| !r.is_filled()).map(|r| r.id).collect();
        debug!(records = records.len(), unfilled = unfilled.len(), "filling details");
        futures::stream::iter(unfilled)
            .map(|id| async move { (id, settle(self.detail(id).await).await) })
            .buffer_unordered(self.inner.options.detail_concurrency.max(1))
            .for_each(|(id, outcome)| async move {
                if let Some(Resource::Error { failure, .. }) = outcome {
                    warn!(id, %failure, "detail left as a placeholder");
                }
            })
            .await;

        match self.cached_details(&scope).await {
            Ok(filled) => Resource::Success(filled.unwrap_or_default()),
            Err(err) => Resource::failed(&err, Some(records)),
        }
    }

    async fn cached_details(&self, scope: &Scope) -> Result<Option<Details>> {
        let records = self.inner.store.read_details(scope).await.map_err(ErrorKind::cache)?;
        Ok((!records.is_empty()).then_some(records))
    }
}
