//! SQLite implementation of [`CacheStore`].

use async_stream::stream;
use async_trait::async_trait;
use dytt_extract::models::{CategoryKey, DetailRecord, ListingRecord, Scope};
use exn::ResultExt;
use sqlx::SqlitePool;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::instrument;

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{DetailRow, ListingRow, id_to_row};
use crate::store::{CacheStore, ListingStream};

/// Repository for listings, details and cursors in the cache database.
///
/// Cloning is cheap: clones share the connection pool and the change
/// channel, so a write through one clone wakes observers of another.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    changes: broadcast::Sender<Scope>,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
            changes: db.changes().clone(),
        }
    }
}
impl Repository {
    fn position(position: usize) -> Result<i64> {
        i64::try_from(position).or_raise(|| ErrorKind::InvalidData("position"))
    }
}

#[async_trait]
impl CacheStore for Repository {
    async fn read_listing(&self, scope: &Scope) -> Result<Vec<ListingRecord>> {
        let rows: Vec<ListingRow> = sqlx::query_as(include_str!("../queries/select_listing.sql"))
            .bind(scope.category.as_str())
            .bind(scope.query_text())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(ListingRecord::try_from).collect()
    }

    fn observe_listing(&self, scope: Scope) -> ListingStream {
        let repo = self.clone();
        // Subscribe before the first read, so that no write can slip in between.
        let mut changes = self.changes.subscribe();
        Box::pin(stream! {
            yield repo.read_listing(&scope).await;
            loop {
                match changes.recv().await {
                    Ok(changed) if changed == scope => yield repo.read_listing(&scope).await,
                    Ok(_) => {},
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(%scope, skipped, "listing observer lagged, re-reading");
                        yield repo.read_listing(&scope).await;
                    },
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    #[instrument(skip(self, records), fields(%scope, records = records.len()))]
    async fn write_listing(&self, scope: &Scope, page: u32, records: &[ListingRecord]) -> Result<()> {
        if records.iter().any(|record| record.category != scope.category) {
            exn::bail!(ErrorKind::InvalidData("category"));
        }
        let rows = records.iter().map(ListingRow::try_from).collect::<Result<Vec<_>>>()?;
        let category = scope.category.as_str();
        let query = scope.query_text();
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        if page <= scope.category.default_page() {
            sqlx::query(include_str!("../queries/delete_listing_scope.sql"))
                .bind(category)
                .bind(query)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        } else {
            sqlx::query(include_str!("../queries/delete_listing_page.sql"))
                .bind(category)
                .bind(query)
                .bind(page)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        for (position, row) in rows.into_iter().enumerate() {
            sqlx::query(include_str!("../queries/upsert_listing.sql"))
                .bind(category)
                .bind(query)
                .bind(row.id)
                .bind(row.title)
                .bind(row.link)
                .bind(row.published_on)
                .bind(row.captured_at)
                .bind(page)
                .bind(Self::position(position)?)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        tracing::debug!(page, "persisted listing page");
        // Nobody observing is fine.
        _ = self.changes.send(scope.clone());
        Ok(())
    }

    #[instrument(skip_all, fields(records = records.len()))]
    async fn write_placeholders(&self, records: &[ListingRecord]) -> Result<()> {
        let rows = records.iter().map(ListingRow::try_from).collect::<Result<Vec<_>>>()?;
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        for row in rows {
            sqlx::query(include_str!("../queries/upsert_placeholder.sql"))
                .bind(row.id)
                .bind(row.link)
                .bind(row.title)
                .bind(row.published_on)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)
    }

    async fn read_detail(&self, id: u64) -> Result<Option<DetailRecord>> {
        let row: Option<DetailRow> = sqlx::query_as(include_str!("../queries/select_detail.sql"))
            .bind(id_to_row(id)?)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(DetailRecord::try_from).transpose()
    }

    #[instrument(skip_all, fields(id = record.id))]
    async fn write_detail(&self, record: &DetailRecord) -> Result<()> {
        let row = DetailRow::try_from(record)?;
        sqlx::query(include_str!("../queries/upsert_detail.sql"))
            .bind(row.id)
            .bind(row.link)
            .bind(row.title)
            .bind(row.cover)
            .bind(row.fields)
            .bind(row.synopsis)
            .bind(row.refs)
            .bind(row.published_on)
            .bind(row.extracted_at)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    async fn read_details(&self, scope: &Scope) -> Result<Vec<DetailRecord>> {
        let rows: Vec<DetailRow> = sqlx::query_as(include_str!("../queries/select_details_for_scope.sql"))
            .bind(scope.category.as_str())
            .bind(scope.query_text())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(DetailRecord::try_from).collect()
    }

    async fn read_cursor(&self, category: CategoryKey) -> Result<u32> {
        let page: Option<i64> = sqlx::query_scalar(include_str!("../queries/select_cursor.sql"))
            .bind(category.as_str())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        match page {
            Some(page) => u32::try_from(page).or_raise(|| ErrorKind::InvalidData("cursor")),
            None => Ok(0),
        }
    }

    #[instrument(skip(self))]
    async fn write_cursor(&self, category: CategoryKey, page: u32) -> Result<()> {
        sqlx::query(include_str!("../queries/upsert_cursor.sql"))
            .bind(category.as_str())
            .bind(page)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dytt_extract::models::QueryKey;
    use futures::StreamExt;
    use time::UtcDateTime;

    use super::*;

    async fn repository() -> Repository {
        Repository::from(&Database::connect_in_memory().await.unwrap())
    }

    fn record(category: CategoryKey, id: u64) -> ListingRecord {
        ListingRecord {
            id,
            category,
            title: format!("Movie {id}"),
            link: format!("/html/gndy/dyzz/20180330/{id}.html"),
            published: None,
            captured_at: UtcDateTime::from_unix_timestamp(1_522_375_644).unwrap(),
        }
    }

    fn records(category: CategoryKey, ids: &[u64]) -> Vec<ListingRecord> {
        ids.iter().map(|id| record(category, *id)).collect()
    }

    fn ids(records: &[ListingRecord]) -> Vec<u64> {
        records.iter().map(|r| r.id).collect()
    }

    #[tokio::test]
    async fn test_listing_keeps_page_order() {
        let repo = repository().await;
        let scope = Scope::category(CategoryKey::NewMovie);
        repo.write_listing(&scope, 1, &records(CategoryKey::NewMovie, &[3, 1, 2])).await.unwrap();
        repo.write_listing(&scope, 2, &records(CategoryKey::NewMovie, &[9, 4])).await.unwrap();
        assert_eq!(ids(&repo.read_listing(&scope).await.unwrap()), vec![3, 1, 2, 9, 4]);
        assert_eq!(repo.read_listing(&scope).await.unwrap()[0], record(CategoryKey::NewMovie, 3));
    }

    #[tokio::test]
    async fn test_first_page_replaces_the_whole_scope() {
        let repo = repository().await;
        let scope = Scope::category(CategoryKey::China);
        repo.write_listing(&scope, 1, &records(CategoryKey::China, &[1, 2, 3])).await.unwrap();
        repo.write_listing(&scope, 2, &records(CategoryKey::China, &[4, 5])).await.unwrap();
        repo.write_listing(&scope, 1, &records(CategoryKey::China, &[0, 1, 2])).await.unwrap();
        assert_eq!(ids(&repo.read_listing(&scope).await.unwrap()), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_later_pages_replace_only_themselves() {
        let repo = repository().await;
        let scope = Scope::category(CategoryKey::Oumei);
        repo.write_listing(&scope, 1, &records(CategoryKey::Oumei, &[1, 2])).await.unwrap();
        repo.write_listing(&scope, 2, &records(CategoryKey::Oumei, &[3, 4])).await.unwrap();
        // The site shifted by one: 2 moved to page two, 4 fell off it.
        repo.write_listing(&scope, 2, &records(CategoryKey::Oumei, &[2, 3])).await.unwrap();
        assert_eq!(ids(&repo.read_listing(&scope).await.unwrap()), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() {
        let repo = repository().await;
        let first = Scope::search(QueryKey::new("魔戒").unwrap());
        let second = Scope::search(QueryKey::new("魅影缝匠").unwrap());
        repo.write_listing(&first, 1, &records(CategoryKey::Search, &[1, 2])).await.unwrap();
        repo.write_listing(&second, 1, &records(CategoryKey::Search, &[2, 3])).await.unwrap();
        repo.write_listing(&Scope::category(CategoryKey::Rihan), 1, &records(CategoryKey::Rihan, &[7])).await.unwrap();
        assert_eq!(ids(&repo.read_listing(&first).await.unwrap()), vec![1, 2]);
        assert_eq!(ids(&repo.read_listing(&second).await.unwrap()), vec![2, 3]);
    }

    #[tokio::test]
    async fn test_mismatched_category_is_rejected() {
        let repo = repository().await;
        let scope = Scope::category(CategoryKey::China);
        let err = repo.write_listing(&scope, 1, &records(CategoryKey::Rihan, &[1])).await.unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidData("category"));
    }

    #[tokio::test]
    async fn test_placeholders_never_overwrite_filled_details() {
        let repo = repository().await;
        let listing = records(CategoryKey::NewMovie, &[1, 2]);
        repo.write_placeholders(&listing).await.unwrap();
        let placeholder = repo.read_detail(1).await.unwrap().unwrap();
        assert!(!placeholder.is_filled());
        assert_eq!(placeholder, DetailRecord::placeholder(&listing[0]));

        let mut filled = DetailRecord::placeholder(&listing[0]);
        filled.title = "Filled".to_string();
        filled.references = vec!["ftp://a/b.mkv".to_string()];
        filled.extracted_at = Some(UtcDateTime::from_unix_timestamp(1_522_400_000).unwrap());
        repo.write_detail(&filled).await.unwrap();
        repo.write_placeholders(&listing).await.unwrap();
        assert_eq!(repo.read_detail(1).await.unwrap().unwrap(), filled);
        assert_eq!(repo.read_detail(3).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_details_follow_listing_order() {
        let repo = repository().await;
        let scope = Scope::category(CategoryKey::HomeLatest);
        let listing = records(CategoryKey::HomeLatest, &[5, 2, 8]);
        repo.write_listing(&scope, 1, &listing).await.unwrap();
        repo.write_placeholders(&listing[..2]).await.unwrap();
        let details = repo.read_details(&scope).await.unwrap();
        assert_eq!(details.iter().map(|d| d.id).collect::<Vec<_>>(), vec![5, 2]);
    }

    #[tokio::test]
    async fn test_cursor() {
        let repo = repository().await;
        assert_eq!(repo.read_cursor(CategoryKey::NewMovie).await.unwrap(), 0);
        repo.write_cursor(CategoryKey::NewMovie, 3).await.unwrap();
        repo.write_cursor(CategoryKey::China, 1).await.unwrap();
        assert_eq!(repo.read_cursor(CategoryKey::NewMovie).await.unwrap(), 3);
        repo.write_cursor(CategoryKey::NewMovie, 0).await.unwrap();
        assert_eq!(repo.read_cursor(CategoryKey::NewMovie).await.unwrap(), 0);
        assert_eq!(repo.read_cursor(CategoryKey::China).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_observe_listing() {
        let repo = repository().await;
        let scope = Scope::category(CategoryKey::China);
        let mut observed = repo.observe_listing(scope.clone());
        assert!(observed.next().await.unwrap().unwrap().is_empty());

        repo.write_listing(&Scope::category(CategoryKey::Rihan), 1, &records(CategoryKey::Rihan, &[9])).await.unwrap();
        repo.write_listing(&scope, 1, &records(CategoryKey::China, &[1, 2])).await.unwrap();
        // The write to another scope is not announced here.
        assert_eq!(ids(&observed.next().await.unwrap().unwrap()), vec![1, 2]);

        let quiet = tokio::time::timeout(Duration::from_millis(50), observed.next()).await;
        assert!(quiet.is_err(), "no further writes, no further snapshots");
    }
}
