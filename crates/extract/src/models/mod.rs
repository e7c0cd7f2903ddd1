mod category;
mod detail;
mod listing;
mod query;
mod scope;

pub use self::category::{CategoryKey, MarkupShape};
pub use self::detail::{DetailFields, DetailRecord};
pub use self::listing::ListingRecord;
pub use self::query::QueryKey;
pub use self::scope::Scope;

fn sanitize(s: impl AsRef<str>) -> String {
    s.as_ref().trim().to_lowercase().replace('/', "").replace('-', "").replace('_', "").replace(' ', "")
}
