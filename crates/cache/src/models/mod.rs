mod detail;
mod listing;

use exn::ResultExt;
use time::{Date, UtcDateTime};

pub(crate) use self::detail::DetailRow;
pub(crate) use self::listing::ListingRow;
use crate::error::{ErrorKind, Result};

/// Dates are stored as the unix timestamp of their midnight (UTC).
fn date_to_row(date: Date) -> i64 {
    date.midnight().as_utc().unix_timestamp()
}

fn date_from_row(timestamp: i64, field: &'static str) -> Result<Date> {
    Ok(UtcDateTime::from_unix_timestamp(timestamp).or_raise(|| ErrorKind::InvalidData(field))?.date())
}

pub(crate) fn id_to_row(id: u64) -> Result<i64> {
    i64::try_from(id).or_raise(|| ErrorKind::InvalidData("id"))
}

fn id_from_row(id: i64) -> Result<u64> {
    u64::try_from(id).or_raise(|| ErrorKind::InvalidData("id"))
}
