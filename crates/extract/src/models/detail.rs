use time::{Date, UtcDateTime};

use super::ListingRecord;

/// Labeled fields of a detail page (the `◎label value` block).
///
/// Every field is optional; the site is inconsistent about which ones it
/// fills in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DetailFields {
    /// 译名
    pub translated_name: Option<String>,
    /// 片名
    pub name: Option<String>,
    /// 年代
    pub year: Option<String>,
    /// 产地
    pub country: Option<String>,
    /// 类别
    pub genre: Option<String>,
    /// 语言
    pub language: Option<String>,
    /// 字幕
    pub subtitles: Option<String>,
    /// 上映日期
    pub release_date: Option<String>,
    /// 豆瓣评分
    pub douban_rating: Option<String>,
    /// IMDb评分
    pub imdb_rating: Option<String>,
    /// 文件格式
    pub file_format: Option<String>,
    /// 视频尺寸
    pub resolution: Option<String>,
    /// 文件大小
    pub size: Option<String>,
    /// 片长
    pub duration: Option<String>,
    /// 导演
    pub director: Option<String>,
    /// 主演, one entry per line on the page.
    pub cast: Vec<String>,
}

/// Denormalized metadata for one [`ListingRecord`], keyed by the same id.
///
/// A record without any `references` is a placeholder: it was derived from a
/// listing row and its detail page has not been fetched (successfully) yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRecord {
    pub id: u64,
    /// Path (or URL) of the detail page this record was, or will be, extracted from.
    pub link: String,
    pub title: String,
    pub cover: Option<String>,
    pub fields: DetailFields,
    pub synopsis: Option<String>,
    /// Download and stream references (ftp, magnet, thunder, ed2k, media URLs).
    pub references: Vec<String>,
    pub published: Option<Date>,
    /// `None` until the detail page has been extracted.
    pub extracted_at: Option<UtcDateTime>,
}
impl DetailRecord {
    /// Placeholder for a listing row, to be filled in lazily.
    pub fn placeholder(listing: &ListingRecord) -> Self {
        Self {
            id: listing.id,
            link: listing.link.clone(),
            title: listing.title.clone(),
            cover: None,
            fields: DetailFields::default(),
            synopsis: None,
            references: Vec::new(),
            published: listing.published,
            extracted_at: None,
        }
    }

    /// Whether the detail page has been extracted into this record.
    pub fn is_filled(&self) -> bool {
        !self.references.is_empty()
    }
}
impl From<&ListingRecord> for DetailRecord {
    fn from(listing: &ListingRecord) -> Self {
        Self::placeholder(listing)
    }
}
