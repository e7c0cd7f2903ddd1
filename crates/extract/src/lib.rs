//! Decoding and record extraction for the listing and detail pages of the
//! dytt movie site.
//!
//! Everything in this crate is pure: it never fetches anything and never
//! touches storage. Feed it the bytes of a page and get records back.

mod consts;
mod decode;
pub mod error;
mod extract;
pub mod models;

use tracing::instrument;

pub use crate::decode::decode;
use crate::error::Result;
pub use crate::extract::{Extractor, video_id};
use crate::models::{CategoryKey, DetailRecord, ListingRecord};

/// Easy, top-level entrypoint for the extraction of listing rows from raw
/// page bytes.
///
/// Accepts raw bytes instead of requiring valid UTF-8: the page is decoded
/// with whatever charset it declares (see [`decode`]).
#[instrument(skip(markup), fields(html_size = markup.as_ref().len()))]
pub fn parse_listing(markup: impl AsRef<[u8]>, category: CategoryKey) -> Result<Vec<ListingRecord>> {
    Extractor::from_bytes(markup.as_ref()).listing(category)
}

/// Easy, top-level entrypoint for the extraction of a [`DetailRecord`] from
/// the raw bytes of the page found at `link`.
#[instrument(skip(markup), fields(html_size = markup.as_ref().len()))]
pub fn parse_detail(markup: impl AsRef<[u8]>, link: &str) -> Result<DetailRecord> {
    Extractor::from_bytes(markup.as_ref()).detail(link)
}
