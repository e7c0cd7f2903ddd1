//! Turning raw page bytes into text.
//!
//! The site declares `gb2312` but actually serves GBK (or worse), while
//! some mirrors and the test fixtures are UTF-8. Decoding never fails:
//! malformed sequences become U+FFFD, same as a browser would show them.

use std::borrow::Cow;

use encoding_rs::{Encoding, GBK, UTF_8};
use tracing::instrument;

use crate::consts::{CHARSET_REGEX, CHARSET_SNIFF_BYTES};

/// Finds the encoding declared in the head of the document, if any.
pub(crate) fn sniff(html: &[u8]) -> Option<&'static Encoding> {
    let head = &html[..html.len().min(CHARSET_SNIFF_BYTES)];
    let label = CHARSET_REGEX.captures(head)?.get(1)?;
    Encoding::for_label(label.as_bytes())
}

/// Decodes raw markup into a string.
///
/// 1. A UTF-8 or UTF-16 byte order mark wins.
/// 2. Otherwise a `charset=` declaration near the start of the document.
/// 3. Otherwise UTF-8 if the bytes are valid UTF-8, GBK if not.
///
/// # Examples
///
/// ```rust
/// use dytt_extract::decode;
/// let html = b"<meta charset=\"gb2312\"><p>\xc4\xa7\xbd\xe4</p>";
/// assert_eq!(decode(html), "<meta charset=\"gb2312\"><p>魔戒</p>");
/// ```
#[instrument(level = "trace", skip(html), fields(html_size = html.len()))]
pub fn decode(html: &[u8]) -> Cow<'_, str> {
    if let Some((encoding, _)) = Encoding::for_bom(html) {
        return encoding.decode_with_bom_removal(html).0;
    }
    let encoding = match self::sniff(html) {
        Some(encoding) => encoding,
        None if std::str::from_utf8(html).is_ok() => UTF_8,
        None => GBK,
    };
    let (text, had_errors) = encoding.decode_without_bom_handling(html);
    if had_errors {
        tracing::debug!(encoding = encoding.name(), "replaced malformed byte sequences while decoding");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=gb2312\" />".as_slice(), Some(GBK))]
    #[case(b"<meta charset='GBK'>".as_slice(), Some(GBK))]
    #[case(b"<meta charset=\"utf-8\">".as_slice(), Some(UTF_8))]
    #[case(b"<html><head><title>none</title>".as_slice(), None)]
    #[case(b"<meta charset=\"klingon\">".as_slice(), None)]
    fn test_sniff(#[case] html: &[u8], #[case] expected: Option<&'static Encoding>) {
        assert_eq!(sniff(html), expected);
    }

    #[test]
    fn test_undeclared_gbk_falls_back_to_gbk() {
        let (bytes, _, _) = GBK.encode("<p>魅影缝匠</p>");
        assert_eq!(decode(&bytes), "<p>魅影缝匠</p>");
    }

    #[test]
    fn test_undeclared_utf8_stays_utf8() {
        assert_eq!(decode("<p>魅影缝匠</p>".as_bytes()), "<p>魅影缝匠</p>");
    }

    #[test]
    fn test_bom_beats_declaration() {
        let mut html = vec![0xEF, 0xBB, 0xBF];
        html.extend_from_slice("<meta charset=\"gb2312\"><p>影</p>".as_bytes());
        assert_eq!(decode(&html), "<meta charset=\"gb2312\"><p>影</p>");
    }

    #[test]
    fn test_malformed_sequences_are_replaced() {
        let html = b"<meta charset=\"utf-8\"><p>\xff</p>";
        assert_eq!(decode(html), "<meta charset=\"utf-8\"><p>\u{FFFD}</p>");
    }
}
