//! Per-category pagination cursors.
//!
//! The cursor of a category counts the pages consumed, so `0` means nothing
//! has been loaded yet and the next page is `default_page + cursor`. All
//! cursor mutations of one category are serialized behind one lock; the
//! cursor value itself lives in the cache, so it survives restarts.
//!
//! Each lock also counts the resets it has seen since the process started.
//! A reset followed by an advance can bring the cursor back to the value a
//! page in flight was fetched against; the generation tells the two apart.

use std::collections::HashMap;
use std::sync::Arc;

use dytt_cache::StoreHandle;
use dytt_extract::models::CategoryKey;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::instrument;

use crate::error::{ErrorKind, Result};

pub struct PaginationTracker {
    store: StoreHandle,
    locks: Mutex<HashMap<CategoryKey, Arc<Mutex<u64>>>>,
}
impl PaginationTracker {
    pub fn new(store: StoreHandle) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Hold the cursor of `category` until the guard is dropped.
    pub async fn lock(&self, category: CategoryKey) -> CursorGuard<'_> {
        let lock = Arc::clone(self.locks.lock().await.entry(category).or_default());
        CursorGuard {
            store: &self.store,
            category,
            generation: lock.lock_owned().await,
        }
    }

    /// Pages consumed for `category`.
    pub async fn next_page(&self, category: CategoryKey) -> Result<u32> {
        self.lock(category).await.current().await
    }

    /// Record one more page as consumed, returning the new cursor.
    pub async fn advance(&self, category: CategoryKey) -> Result<u32> {
        self.lock(category).await.advance().await
    }

    /// Forget every page consumed, starting a new generation.
    pub async fn reset(&self, category: CategoryKey) -> Result<()> {
        self.lock(category).await.reset().await
    }
}

/// Exclusive access to the cursor of one category.
pub struct CursorGuard<'a> {
    store: &'a StoreHandle,
    category: CategoryKey,
    generation: OwnedMutexGuard<u64>,
}
impl CursorGuard<'_> {
    pub fn category(&self) -> CategoryKey {
        self.category
    }

    /// Number of resets this cursor has seen.
    pub fn generation(&self) -> u64 {
        *self.generation
    }

    pub async fn current(&self) -> Result<u32> {
        self.store.read_cursor(self.category).await.map_err(ErrorKind::cache)
    }

    #[instrument(skip(self), fields(category = %self.category))]
    pub async fn advance(&mut self) -> Result<u32> {
        let next = self.current().await?.saturating_add(1);
        self.store.write_cursor(self.category, next).await.map_err(ErrorKind::cache)?;
        tracing::debug!(cursor = next, "cursor advanced");
        Ok(next)
    }

    #[instrument(skip(self), fields(category = %self.category))]
    pub async fn reset(&mut self) -> Result<()> {
        self.store.write_cursor(self.category, 0).await.map_err(ErrorKind::cache)?;
        *self.generation += 1;
        tracing::debug!(generation = *self.generation, "cursor reset");
        Ok(())
    }
}
