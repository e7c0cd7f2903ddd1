//! Structural extraction of listing rows and detail pages.
//!
//! Every markup shape the site serves gets its own explicit set of
//! landmarks (see [`MarkupShape`]), so that each extractor can be tested
//! against fixed sample pages.

mod detail;
mod listing;

use std::convert::Infallible;
use std::str::FromStr;

use exn::OptionExt;
use regex::Captures;
use scraper::Html;
use time::{Date, Month, UtcDateTime};
use tracing::instrument;

use crate::consts;
use crate::decode::decode;
use crate::error::{ErrorKind, Result};
use crate::models::{CategoryKey, DetailRecord, ListingRecord, MarkupShape};

/// A parsed page, ready for extraction.
///
/// Extraction is pure: the same markup and capture time always produce the
/// same records, in the same order.
#[derive(Debug)]
pub struct Extractor {
    document: Html,
    captured_at: UtcDateTime,
}
impl Extractor {
    pub fn from_document(document: Html) -> Self {
        Self {
            document,
            captured_at: UtcDateTime::now(),
        }
    }

    pub fn from_html(html: &str) -> Self {
        Self::from_document(Html::parse_document(html))
    }

    /// Construct an [`Extractor`] from raw page bytes, in whatever encoding
    /// the page declares (see [`decode`](crate::decode)).
    pub fn from_bytes(html: &[u8]) -> Self {
        Self::from_html(&decode(html))
    }

    /// Override the capture timestamp stamped on extracted records (defaults
    /// to the time the extractor was created).
    pub fn captured_at(mut self, captured_at: UtcDateTime) -> Self {
        self.captured_at = captured_at;
        self
    }

    /// Extracts the listing rows of a page belonging to `category`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidDocument`] if the landmark container of
    /// the category's [`MarkupShape`] is missing. Individual rows without an
    /// identifier or a title are skipped, not reported.
    #[instrument(skip(self), fields(shape = %category.shape(), rows))]
    pub fn listing(&self, category: CategoryKey) -> Result<Vec<ListingRecord>> {
        let records = listing::Landmarks::for_shape(category.shape()).extract(&self.document, category, self.captured_at)?;
        tracing::Span::current().record("rows", records.len());
        Ok(records)
    }

    /// Extracts the detail record of the page found at `link`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `link` does not carry an identifier
    /// - The page has no detail block
    /// - The detail block has no download or stream reference
    #[instrument(skip(self))]
    pub fn detail(&self, link: &str) -> Result<DetailRecord> {
        detail::extract(&self.document, link, self.captured_at)
    }

    /// Whether the page has the landmark container of a listing `shape`.
    pub fn is_valid(&self, shape: MarkupShape) -> bool {
        listing::Landmarks::for_shape(shape).container(&self.document).is_ok()
    }
}
impl FromStr for Extractor {
    type Err = Infallible;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from_html(s))
    }
}
impl From<String> for Extractor {
    fn from(value: String) -> Self {
        Self::from_html(&value)
    }
}
impl From<Html> for Extractor {
    fn from(document: Html) -> Self {
        Self::from_document(document)
    }
}

/// Extracts the site's article number from a detail link.
///
/// ```rust
/// use dytt_extract::video_id;
/// assert_eq!(video_id("/html/gndy/dyzz/20180330/56604.html"), Some(56604));
/// assert_eq!(video_id("https://www.dytt8.net/html/gndy/jddy/20160320/50523.html#comments"), Some(50523));
/// assert_eq!(video_id("/html/gndy/dyzz/index.html"), None);
/// ```
pub fn video_id(link: &str) -> Option<u64> {
    consts::LINK_ID_REGEX.captures(link.trim())?.get(1)?.as_str().parse().ok()
}

/// Same as [`video_id`], but an error naming the link if there is none.
pub(crate) fn require_video_id(link: &str) -> Result<u64> {
    video_id(link).ok_or_raise(|| ErrorKind::ParseError {
        field: "id",
        value: link.to_string(),
    })
}

/// Builds a date from `(year)-(month)-(day)` capture groups starting at `group`.
///
/// Out-of-range values give `None`; dates are never mandatory.
pub(crate) fn date_from_captures(captures: &Captures<'_>, group: usize) -> Option<Date> {
    let year = captures.get(group)?.as_str().parse::<i32>().ok()?;
    let month = captures.get(group + 1)?.as_str().parse::<u8>().ok()?;
    let day = captures.get(group + 2)?.as_str().parse::<u8>().ok()?;
    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}

/// Trims and collapses internal whitespace (including ideographic spaces).
pub(crate) fn collapse(text: &str) -> String {
    consts::WHITESPACE_REGEX.replace_all(text.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/html/gndy/dyzz/20180330/56604.html", Some(56604))]
    #[case("/html/gndy/china/20180101/1.htm", Some(1))]
    #[case("/html/gndy/oumei/20180101/77.html?from=rss", Some(77))]
    #[case("/html/gndy/dyzz/index.html", None)]
    #[case("/html/gndy/dyzz/list_23_2.html", None)]
    #[case("ftp://example.org/56604.mkv", None)]
    fn test_video_id(#[case] link: &str, #[case] expected: Option<u64>) {
        assert_eq!(video_id(link), expected);
    }

    #[rstest]
    #[case("日期：2018-03-30 10:07:24", Some((2018, Month::March, 30)))]
    #[case("日期：2018-3-9", Some((2018, Month::March, 9)))]
    #[case("日期：2018-13-01", None)]
    #[case("日期：2018-02-30", None)]
    fn test_date_from_captures(#[case] text: &str, #[case] expected: Option<(i32, Month, u8)>) {
        let date = consts::DATE_REGEX.captures(text).and_then(|c| date_from_captures(&c, 1));
        let expected = expected.map(|(y, m, d)| Date::from_calendar_date(y, m, d).unwrap());
        assert_eq!(date, expected);
    }

    #[test]
    fn test_collapse() {
        assert_eq!(collapse("  魅影缝匠/霓裳魅影\u{3000}\u{3000}BD中英双字 \n"), "魅影缝匠/霓裳魅影 BD中英双字");
    }
}
