use dytt_extract::models::{DetailFields, DetailRecord};
use exn::ResultExt;
use serde_json::{from_str as from_json, to_string as to_json};
use time::UtcDateTime;

use super::{date_from_row, date_to_row, id_from_row, id_to_row};
use crate::error::{Error, ErrorKind};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct DetailRow {
    pub(crate) id: i64,
    pub(crate) link: String,
    pub(crate) title: String,
    pub(crate) cover: Option<String>,
    pub(crate) fields: String,
    pub(crate) synopsis: Option<String>,
    pub(crate) refs: String,
    pub(crate) published_on: Option<i64>,
    pub(crate) extracted_at: Option<i64>,
}
impl TryFrom<&DetailRecord> for DetailRow {
    type Error = Error;
    fn try_from(record: &DetailRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: id_to_row(record.id)?,
            link: record.link.clone(),
            title: record.title.clone(),
            cover: record.cover.clone(),
            fields: to_json(&record.fields).or_raise(|| ErrorKind::InvalidData("fields"))?,
            synopsis: record.synopsis.clone(),
            refs: to_json(&record.references).or_raise(|| ErrorKind::InvalidData("references"))?,
            published_on: record.published.map(date_to_row),
            extracted_at: record.extracted_at.map(|at| at.unix_timestamp()),
        })
    }
}
impl TryFrom<DetailRow> for DetailRecord {
    type Error = Error;
    fn try_from(row: DetailRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: id_from_row(row.id)?,
            link: row.link,
            title: row.title,
            cover: row.cover,
            fields: from_json::<DetailFields>(&row.fields).or_raise(|| ErrorKind::InvalidData("fields"))?,
            synopsis: row.synopsis,
            references: from_json::<Vec<String>>(&row.refs).or_raise(|| ErrorKind::InvalidData("references"))?,
            published: row.published_on.map(|p| date_from_row(p, "published on date")).transpose()?,
            extracted_at: row
                .extracted_at
                .map(|at| UtcDateTime::from_unix_timestamp(at).or_raise(|| ErrorKind::InvalidData("extraction date")))
                .transpose()?,
        })
    }
}
