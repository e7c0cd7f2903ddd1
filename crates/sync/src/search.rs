use dytt_extract::models::{CategoryKey, DetailRecord, QueryKey, Scope};
use tokio::sync::Mutex;
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::resource::ResourceStream;
use crate::synchronizer::Synchronizer;

/// The free-text search of one user: the current query and its pages.
///
/// A new query resets the search cursor and resolves in two stages: the
/// search listing for the query first, then the detail records of its rows.
pub struct SearchSession {
    sync: Synchronizer,
    current: Mutex<Option<QueryKey>>,
}
impl SearchSession {
    pub fn new(sync: Synchronizer) -> Self {
        Self {
            sync,
            current: Mutex::new(None),
        }
    }

    /// Search for `raw`.
    ///
    /// Fails without touching the network if `raw` cannot be sent to the
    /// search endpoint. Returns `None` if `raw` normalizes to the current
    /// query.
    #[instrument(skip(self))]
    pub async fn set_query(&self, raw: &str) -> Result<Option<ResourceStream<Vec<DetailRecord>>>> {
        let query = QueryKey::new(raw).map_err(ErrorKind::extract)?;
        let mut current = self.current.lock().await;
        if current.as_ref() == Some(&query) {
            tracing::debug!(%query, "query unchanged");
            return Ok(None);
        }
        self.sync.tracker().reset(CategoryKey::Search).await?;
        *current = Some(query.clone());
        tracing::debug!(%query, "query changed");
        Ok(Some(self.sync.details(Scope::search(query), true).await))
    }

    /// Next page of the current query; `None` if there is no query yet.
    pub async fn load_more(&self) -> Option<ResourceStream<Vec<DetailRecord>>> {
        let query = self.current.lock().await.clone()?;
        Some(self.sync.more_details(Scope::search(query)).await)
    }

    pub async fn query(&self) -> Option<QueryKey> {
        self.current.lock().await.clone()
    }
}
