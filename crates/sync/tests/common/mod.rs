#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dytt_cache::error::Result as CacheResult;
use dytt_cache::{CacheStore, Database, ListingStream, Repository};
use dytt_extract::models::{CategoryKey, DetailRecord, ListingRecord, Scope};
use dytt_remote::source::MockSource;
use dytt_sync::{Resource, ResourceStream, SyncOptions, Synchronizer};
use encoding_rs::GBK;
use futures::StreamExt;
use tokio::sync::Notify;

pub const NEW_MOVIE: &str = include_str!("../../../extract/tests/fixtures/new_movie.html");
pub const HOME: &str = include_str!("../../../extract/tests/fixtures/home.html");
pub const QUERY: &str = include_str!("../../../extract/tests/fixtures/query.html");
pub const DETAIL: &str = include_str!("../../../extract/tests/fixtures/detail.html");

pub const NEW_MOVIE_PATH: &str = "/html/gndy/new_movie";
pub const NEW_MOVIE_PAGE_2: &str = "/html/gndy/new_movie/list_23_2.html";
pub const NEW_MOVIE_PAGE_3: &str = "/html/gndy/new_movie/list_23_3.html";
pub const PHANTOM_THREAD: &str = "/html/gndy/dyzz/20180330/56604.html";

/// Fixtures are kept as UTF-8 for readability; the site serves GBK.
pub fn served(page: &str) -> Vec<u8> {
    let (bytes, _, unmappable) = GBK.encode(page);
    assert!(!unmappable, "page is not representable in GBK");
    bytes.into_owned()
}

/// A category listing page with one row per id.
pub fn category_page(ids: &[u64]) -> Vec<u8> {
    let rows: String = ids
        .iter()
        .map(|id| {
            format!(
                r##"<table class="tbspan"><tr><td><b>
                <a href="/html/gndy/dyzz/index.html" class="ulink">[最新电影]</a>
                <a href="/html/gndy/dyzz/20180301/{id}.html" class="ulink">影片 {id}</a>
                </b></td></tr><tr><td><font color="#8F8C89">日期：2018-03-01 08:00:00</font></td></tr></table>"##
            )
        })
        .collect();
    served(&format!(
        r#"<html><head><meta http-equiv="Content-Type" content="text/html; charset=gb2312" /></head>
        <body><div class="co_content8"><ul>{rows}</ul></div></body></html>"#
    ))
}

/// A detail page with a single download reference, and a title unless
/// `title` is empty.
pub fn detail_page(title: &str) -> Vec<u8> {
    let name = if title.is_empty() { String::new() } else { format!("◎片　　名　{title}<br />") };
    served(&format!(
        r#"<html><head><meta http-equiv="Content-Type" content="text/html; charset=gb2312" /></head>
        <body><div class="title_all"><h1>{title}</h1></div>
        <div id="Zoom"><p>{name}<a href="ftp://example.invalid/movie.mkv">下载</a></p></div>
        </body></html>"#
    ))
}

pub struct Harness {
    pub remote: Arc<MockSource>,
    pub store: Arc<Repository>,
    pub sync: Synchronizer,
}

pub async fn harness(remote: MockSource) -> Harness {
    harness_with(remote, SyncOptions::default()).await
}

pub async fn harness_with(remote: MockSource, options: SyncOptions) -> Harness {
    let db = Database::connect_in_memory().await.unwrap();
    let store = Arc::new(Repository::from(&db));
    let remote = Arc::new(remote);
    let sync = Synchronizer::new(remote.clone(), store.clone(), options);
    Harness { remote, store, sync }
}

/// A [`Repository`] whose next listing observation, once armed, waits for
/// [`open`](Self::open) before producing anything.
pub struct GatedStore {
    inner: Repository,
    armed: AtomicBool,
    reached: Arc<Notify>,
    gate: Arc<Notify>,
}
impl GatedStore {
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Wait until the armed observation is held at the gate.
    pub async fn reached(&self) {
        tokio::time::timeout(Duration::from_secs(10), self.reached.notified())
            .await
            .expect("gate was never reached");
    }

    pub fn open(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl CacheStore for GatedStore {
    async fn read_listing(&self, scope: &Scope) -> CacheResult<Vec<ListingRecord>> {
        self.inner.read_listing(scope).await
    }

    fn observe_listing(&self, scope: Scope) -> ListingStream {
        let mut observed = self.inner.observe_listing(scope);
        if !self.armed.swap(false, Ordering::SeqCst) {
            return observed;
        }
        let reached = Arc::clone(&self.reached);
        let gate = Arc::clone(&self.gate);
        Box::pin(async_stream::stream! {
            reached.notify_one();
            gate.notified().await;
            while let Some(snapshot) = observed.next().await {
                yield snapshot;
            }
        })
    }

    async fn write_listing(&self, scope: &Scope, page: u32, records: &[ListingRecord]) -> CacheResult<()> {
        self.inner.write_listing(scope, page, records).await
    }

    async fn write_placeholders(&self, records: &[ListingRecord]) -> CacheResult<()> {
        self.inner.write_placeholders(records).await
    }

    async fn read_detail(&self, id: u64) -> CacheResult<Option<DetailRecord>> {
        self.inner.read_detail(id).await
    }

    async fn write_detail(&self, record: &DetailRecord) -> CacheResult<()> {
        self.inner.write_detail(record).await
    }

    async fn read_details(&self, scope: &Scope) -> CacheResult<Vec<DetailRecord>> {
        self.inner.read_details(scope).await
    }

    async fn read_cursor(&self, category: CategoryKey) -> CacheResult<u32> {
        self.inner.read_cursor(category).await
    }

    async fn write_cursor(&self, category: CategoryKey, page: u32) -> CacheResult<()> {
        self.inner.write_cursor(category, page).await
    }
}

pub struct GatedHarness {
    pub remote: Arc<MockSource>,
    pub store: Arc<GatedStore>,
    pub sync: Synchronizer,
}

pub async fn gated_harness(remote: MockSource, options: SyncOptions) -> GatedHarness {
    let db = Database::connect_in_memory().await.unwrap();
    let store = Arc::new(GatedStore {
        inner: Repository::from(&db),
        armed: AtomicBool::new(false),
        reached: Arc::new(Notify::new()),
        gate: Arc::new(Notify::new()),
    });
    let remote = Arc::new(remote);
    let sync = Synchronizer::new(remote.clone(), store.clone(), options);
    GatedHarness { remote, store, sync }
}

pub async fn collect<T>(stream: ResourceStream<T>) -> Vec<Resource<T>> {
    tokio::time::timeout(Duration::from_secs(10), stream.collect())
        .await
        .expect("resolution never reached a terminal state")
}

/// Wait until `path` has been requested `count` times (the request may still
/// be held at the gate).
pub async fn until_fetched(remote: &MockSource, path: &str, count: usize) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while remote.fetch_count(path).await < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("fetch was never issued");
}

pub fn ids<'a>(records: impl IntoIterator<Item = &'a ListingRecord>) -> Vec<u64> {
    records.into_iter().map(|r| r.id).collect()
}
