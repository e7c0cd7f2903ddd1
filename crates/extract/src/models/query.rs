use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use encoding_rs::GBK;
use url::form_urlencoded::byte_serialize;

use crate::error::{Error, ErrorKind, Result};

/// A normalized free-text search term, scoped to [`CategoryKey::Search`](super::CategoryKey::Search).
///
/// The remote search endpoint only understands form-encoded GBK, so the
/// encoded form is computed once up-front: lower-cased, trimmed, GBK bytes,
/// `application/x-www-form-urlencoded` (spaces become `+`, only
/// alphanumerics and `*-._` are left bare, hex digits are upper-case).
///
/// ```rust
/// use dytt_extract::models::QueryKey;
/// let query = QueryKey::new("  Phantom Thread ").unwrap();
/// assert_eq!(query.text(), "phantom thread");
/// assert_eq!(query.encoded(), "phantom+thread");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    text: String,
    encoded: String,
}
impl QueryKey {
    pub fn new(input: impl AsRef<str>) -> Result<Self> {
        let text = input.as_ref().trim().to_lowercase();
        if text.is_empty() {
            exn::bail!(ErrorKind::Encoding("empty query".to_string()));
        }
        if text.chars().any(char::is_control) {
            exn::bail!(ErrorKind::Encoding(format!("control characters in {text:?}")));
        }
        let (bytes, _, unmappable) = GBK.encode(&text);
        if unmappable {
            exn::bail!(ErrorKind::Encoding(format!("{text:?} cannot be represented in GBK")));
        }
        let encoded = byte_serialize(&bytes).collect::<String>();
        Ok(Self { text, encoded })
    }

    /// The normalized (lower-cased, trimmed) query text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The transport-encoded query, ready to be embedded in a URL.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }
}
impl FromStr for QueryKey {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}
impl Display for QueryKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.text)
    }
}
