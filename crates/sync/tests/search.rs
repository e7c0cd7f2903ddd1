mod common;

use common::*;
use dytt_extract::error::ErrorKind as ExtractErrorKind;
use dytt_extract::models::{CategoryKey, QueryKey, Scope};
use dytt_remote::error::ErrorKind as RemoteErrorKind;
use dytt_remote::source::MockSource;
use dytt_sync::error::ErrorKind;
use dytt_sync::{Resource, SearchSession};

const SEARCH_PATH: &str =
    "http://s.ygdy8.com/plus/so.php?kwtype=0&searchtype=title&keyword=%F7%C8%D3%B0%B7%EC%BD%B3";
const SECOND_RESULT: &str = "/html/gndy/jddy/20180225/56380.html";

fn remote() -> MockSource {
    MockSource::default()
        .with_page(SEARCH_PATH, served(QUERY))
        .with_page(PHANTOM_THREAD, served(DETAIL))
        .with_failure(SECOND_RESULT, RemoteErrorKind::Http(503))
}

#[tokio::test]
async fn query_resolves_listing_then_details() {
    let h = harness(remote()).await;
    let session = SearchSession::new(h.sync.clone());

    let stream = session.set_query("魅影缝匠").await.unwrap().expect("a new query starts a resolution");
    let emissions = collect(stream).await;
    assert_eq!(emissions.len(), 2);
    assert_eq!(emissions[0], Resource::Loading(None));
    let Resource::Success(details) = &emissions[1] else {
        panic!("expected success, got {:?}", emissions[1]);
    };
    assert_eq!(details.iter().map(|d| d.id).collect::<Vec<_>>(), vec![56604, 56380]);

    let filled = &details[0];
    assert!(filled.is_filled());
    assert_eq!(filled.title, "2018年剧情《魅影缝匠》BD中英双字幕");
    assert_eq!(filled.fields.name.as_deref(), Some("Phantom Thread"));
    assert_eq!(filled.references.len(), 2);

    // A detail that could not be fetched stays a placeholder.
    let placeholder = &details[1];
    assert!(!placeholder.is_filled());
    assert_eq!(placeholder.title, "2017年剧情《魅影缝匠》HD中字");
    assert_eq!(placeholder.link, SECOND_RESULT);

    let scope = Scope::search(QueryKey::new("魅影缝匠").unwrap());
    assert_eq!(ids(&h.sync.store().read_listing(&scope).await.unwrap()), vec![56604, 56380]);
    assert_eq!(h.sync.tracker().next_page(CategoryKey::Search).await.unwrap(), 1);
    assert_eq!(h.remote.fetch_count(SEARCH_PATH).await, 1);
    assert_eq!(h.remote.fetch_count(PHANTOM_THREAD).await, 1);
    assert_eq!(h.remote.fetch_count(SECOND_RESULT).await, 1);
}

#[tokio::test]
async fn unchanged_query_is_a_no_op() {
    let h = harness(remote()).await;
    let session = SearchSession::new(h.sync.clone());
    collect(session.set_query("魅影缝匠").await.unwrap().unwrap()).await;
    let fetches = h.remote.total_fetches().await;

    assert!(session.set_query("  魅影缝匠 ").await.unwrap().is_none());
    assert_eq!(h.remote.total_fetches().await, fetches);
    assert_eq!(session.query().await.map(|q| q.text().to_string()).as_deref(), Some("魅影缝匠"));
}

#[tokio::test]
async fn unencodable_query_never_reaches_the_remote() {
    let h = harness(remote()).await;
    let session = SearchSession::new(h.sync.clone());
    let err = session.set_query("🎬").await.err().expect("the query cannot be encoded");
    assert!(matches!(&*err, ErrorKind::Extract(ExtractErrorKind::Encoding(_))));
    assert_eq!(h.remote.total_fetches().await, 0);
    assert!(session.query().await.is_none());
    assert!(session.load_more().await.is_none());
}

#[tokio::test]
async fn changed_query_resets_the_search_cursor() {
    let h = harness(remote()).await;
    let session = SearchSession::new(h.sync.clone());
    collect(session.set_query("魅影缝匠").await.unwrap().unwrap()).await;
    assert_eq!(h.sync.tracker().next_page(CategoryKey::Search).await.unwrap(), 1);

    // Nothing is served for this one, so the cursor stays where the reset left it.
    let emissions = collect(session.set_query("matrix").await.unwrap().unwrap()).await;
    let Resource::Error { failure, data } = &emissions[1] else {
        panic!("expected an error, got {:?}", emissions[1]);
    };
    assert_eq!(failure.kind, ErrorKind::Remote(RemoteErrorKind::Http(404)));
    assert_eq!(*data, None);
    assert_eq!(h.sync.tracker().next_page(CategoryKey::Search).await.unwrap(), 0);
}

#[tokio::test]
async fn load_more_pages_the_current_query() {
    let h = harness(remote()).await;
    let session = SearchSession::new(h.sync.clone());
    collect(session.set_query("魅影缝匠").await.unwrap().unwrap()).await;

    let emissions = collect(session.load_more().await.unwrap()).await;
    assert_eq!(emissions[0].data().map(Vec::len), Some(2));
    let Resource::Error { failure, data } = &emissions[1] else {
        panic!("expected an error, got {:?}", emissions[1]);
    };
    assert_eq!(failure.kind, ErrorKind::Remote(RemoteErrorKind::Http(404)));
    assert_eq!(data.as_ref().map(Vec::len), Some(2));
    assert_eq!(h.remote.fetch_count(&format!("{SEARCH_PATH}&PageNo=2")).await, 1);
    assert_eq!(h.sync.tracker().next_page(CategoryKey::Search).await.unwrap(), 1);
}
