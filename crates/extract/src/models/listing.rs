use time::{Date, UtcDateTime};

use super::CategoryKey;

/// One row extracted from a listing page.
///
/// The `id` is the site's article number, taken from the detail link; it is
/// unique within a category's record set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRecord {
    pub id: u64,
    pub category: CategoryKey,
    pub title: String,
    /// Path (or URL) of the detail page.
    pub link: String,
    /// Publication date shown next to the row, if any.
    pub published: Option<Date>,
    pub captured_at: UtcDateTime,
}
