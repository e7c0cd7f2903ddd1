use std::collections::HashSet;

use exn::OptionExt;
use scraper::{ElementRef, Html, Selector};
use time::UtcDateTime;

use super::{collapse, date_from_captures, video_id};
use crate::consts;
use crate::error::{ErrorKind, Result};
use crate::models::{CategoryKey, ListingRecord, MarkupShape};

/// Landmark rules for one listing markup shape.
///
/// - `container`: the first match delimits the listing; its absence means the
///   page is not a listing of this shape at all.
/// - `row`: one match per listed movie, searched within the container.
/// - `anchor`: candidate links within a row; the first one whose `href`
///   carries an article number is the row's detail link.
pub(crate) struct Landmarks {
    shape: MarkupShape,
    container: &'static Selector,
    row: &'static Selector,
    anchor: &'static Selector,
}
impl Landmarks {
    pub(crate) fn for_shape(shape: MarkupShape) -> Self {
        match shape {
            MarkupShape::Home => Self {
                shape,
                container: &consts::HOME_CONTAINER_SELECTOR,
                row: &consts::HOME_ROW_SELECTOR,
                anchor: &consts::ANCHOR_SELECTOR,
            },
            MarkupShape::Category => Self {
                shape,
                container: &consts::CATEGORY_CONTAINER_SELECTOR,
                row: &consts::CATEGORY_ROW_SELECTOR,
                anchor: &consts::CATEGORY_ANCHOR_SELECTOR,
            },
            MarkupShape::Search => Self {
                shape,
                container: &consts::SEARCH_CONTAINER_SELECTOR,
                row: &consts::SEARCH_ROW_SELECTOR,
                anchor: &consts::SEARCH_ANCHOR_SELECTOR,
            },
        }
    }

    pub(crate) fn container<'a>(&self, document: &'a Html) -> Result<ElementRef<'a>> {
        document.select(self.container).next().ok_or_raise(|| ErrorKind::InvalidDocument(self.shape.as_str()))
    }

    pub(crate) fn extract(
        &self,
        document: &Html,
        category: CategoryKey,
        captured_at: UtcDateTime,
    ) -> Result<Vec<ListingRecord>> {
        let container = self.container(document)?;
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for (index, row) in container.select(self.row).enumerate() {
            let Some(record) = self.row(row, category, captured_at) else {
                tracing::trace!(index, "skipping row without identifier or title");
                continue;
            };
            // Nested tables and repeated blocks list the same movie more than once.
            if seen.insert(record.id) {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn row(&self, row: ElementRef<'_>, category: CategoryKey, captured_at: UtcDateTime) -> Option<ListingRecord> {
        let (anchor, href, id) = row.select(self.anchor).find_map(|anchor| {
            let href = anchor.value().attr("href")?.trim();
            video_id(href).map(|id| (anchor, href, id))
        })?;
        let title = collapse(&anchor.text().collect::<String>());
        if title.is_empty() {
            return None;
        }
        let text = row.text().collect::<String>();
        let published = consts::DATE_REGEX.captures(&text).and_then(|c| date_from_captures(&c, 1));
        Some(ListingRecord {
            id,
            category,
            title,
            link: href.to_string(),
            published,
            captured_at,
        })
    }
}
