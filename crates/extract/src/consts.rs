use regex::Regex;
use regex::bytes::Regex as BytesRegex;
use scraper::Selector;
use std::sync::LazyLock;

const DATE: &str = r"(\d{4})-(\d{1,2})-(\d{1,2})";

macro_rules! selector {
    ($name:ident, $css:expr) => {
        pub(crate) static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

/// How many bytes at the start of a document are searched for a charset declaration.
pub(crate) const CHARSET_SNIFF_BYTES: usize = 1024;
pub(crate) static CHARSET_REGEX: LazyLock<BytesRegex> =
    LazyLock::new(|| BytesRegex::new(r#"(?i)charset\s*=\s*["']?([A-Za-z0-9_:.-]+)"#).unwrap());

// The article number at the end of a detail link, e.g. `/html/gndy/dyzz/20180330/56604.html`.
regex!(LINK_ID_REGEX, r"/(\d+)\.html?(?:$|\?|#)");
regex!(DATE_REGEX, DATE);
regex!(PUBLISHED_REGEX, format!(r"发布时间[:：]\s*{DATE}").as_str());
regex!(WHITESPACE_REGEX, r"\s+");
// Anything a download client can be pointed at.
regex!(
    REFERENCE_REGEX,
    r"(?i)^(?:ftp://|magnet:\?|thunder://|ed2k://|https?://\S+\.(?:mkv|mp4|rmvb|avi|torrent)(?:$|\?))"
);

// Home page: the list of the first "latest movies" area. Detail pages carry
// `div.co_area2` as well, but never its `co_content222` list.
selector!(HOME_CONTAINER_SELECTOR, "div.co_area2 div.co_content222");
selector!(HOME_ROW_SELECTOR, "ul li");
// Category listings: one `table` per row, movie link carries the `ulink` class.
selector!(CATEGORY_CONTAINER_SELECTOR, "div.co_content8");
selector!(CATEGORY_ROW_SELECTOR, "table");
selector!(CATEGORY_ANCHOR_SELECTOR, "a.ulink[href]");
// Search results: one `table` per row, movie link in bold.
selector!(SEARCH_CONTAINER_SELECTOR, "div.co_content8");
selector!(SEARCH_ROW_SELECTOR, "ul table");
selector!(SEARCH_ANCHOR_SELECTOR, "b a[href]");
selector!(ANCHOR_SELECTOR, "a[href]");

// Detail pages.
selector!(DETAIL_CONTAINER_SELECTOR, "div#Zoom");
selector!(DETAIL_TITLE_SELECTOR, "div.title_all h1");
selector!(DETAIL_COVER_SELECTOR, "img[src]");
selector!(BODY_SELECTOR, "body");
