use dytt_extract::models::{CategoryKey, ListingRecord};
use exn::ResultExt;
use time::UtcDateTime;

use super::{date_from_row, date_to_row, id_from_row, id_to_row};
use crate::error::{Error, ErrorKind};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ListingRow {
    pub(crate) category: String,
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) link: String,
    pub(crate) published_on: Option<i64>,
    pub(crate) captured_at: i64,
}
impl TryFrom<&ListingRecord> for ListingRow {
    type Error = Error;
    fn try_from(record: &ListingRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            category: record.category.as_str().to_string(),
            id: id_to_row(record.id)?,
            title: record.title.clone(),
            link: record.link.clone(),
            published_on: record.published.map(date_to_row),
            captured_at: record.captured_at.unix_timestamp(),
        })
    }
}
impl TryFrom<ListingRow> for ListingRecord {
    type Error = Error;
    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: id_from_row(row.id)?,
            category: row.category.parse::<CategoryKey>().or_raise(|| ErrorKind::InvalidData("category"))?,
            title: row.title,
            link: row.link,
            published: row.published_on.map(|p| date_from_row(p, "published on date")).transpose()?,
            captured_at: UtcDateTime::from_unix_timestamp(row.captured_at)
                .or_raise(|| ErrorKind::InvalidData("capture date"))?,
        })
    }
}
