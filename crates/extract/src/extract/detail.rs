use std::collections::HashSet;

use exn::OptionExt;
use scraper::{ElementRef, Html, Node};
use time::UtcDateTime;

use super::{collapse, date_from_captures, require_video_id};
use crate::consts;
use crate::error::{ErrorKind, Result};
use crate::models::{DetailFields, DetailRecord};

/// Longest label, in non-whitespace characters (`IMDb评分`).
const MAX_LABEL_CHARS: usize = 6;
/// Marks the start of the download section; nothing after it is metadata.
const SECTION_MARKER: char = '【';
const FIELD_MARKER: char = '◎';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    TranslatedName,
    Name,
    Year,
    Country,
    Genre,
    Language,
    Subtitles,
    ReleaseDate,
    DoubanRating,
    ImdbRating,
    FileFormat,
    Resolution,
    Size,
    Duration,
    Director,
    Cast,
    Synopsis,
}
impl Label {
    /// Matches a label with all padding removed (`译　　名` becomes `译名`).
    fn from_compact(label: &str) -> Option<Self> {
        Some(match label {
            "译名" => Self::TranslatedName,
            "片名" => Self::Name,
            "年代" | "年份" => Self::Year,
            "产地" | "国家" => Self::Country,
            "类别" | "类型" => Self::Genre,
            "语言" => Self::Language,
            "字幕" => Self::Subtitles,
            "上映日期" => Self::ReleaseDate,
            "豆瓣评分" => Self::DoubanRating,
            "IMDb评分" | "IMDB评分" | "imdb评分" => Self::ImdbRating,
            "文件格式" => Self::FileFormat,
            "视频尺寸" => Self::Resolution,
            "文件大小" => Self::Size,
            "片长" => Self::Duration,
            "导演" => Self::Director,
            "主演" | "演员" => Self::Cast,
            "简介" | "剧情简介" => Self::Synopsis,
            _ => return None,
        })
    }
}

/// Splits `译　　名　魅影缝匠` into its label and the inline remainder.
fn split_label(line: &str) -> Option<(Label, &str)> {
    let mut compact = String::new();
    for (index, c) in line.char_indices() {
        if c.is_whitespace() {
            continue;
        }
        compact.push(c);
        if let Some(label) = Label::from_compact(&compact) {
            return Some((label, line[index + c.len_utf8()..].trim()));
        }
        if compact.chars().count() >= MAX_LABEL_CHARS {
            return None;
        }
    }
    None
}

/// Renders the detail block as trimmed, non-empty lines: text nodes are
/// concatenated and line breaks are taken from `<br>` and block elements.
fn lines(zoom: ElementRef<'_>) -> Vec<String> {
    let mut text = String::new();
    for node in zoom.descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(e) if matches!(e.name(), "br" | "p" | "div" | "tr" | "table") => text.push('\n'),
            _ => {},
        }
    }
    text.lines().map(str::trim).filter(|line| !line.is_empty()).map(str::to_string).collect()
}

/// The labeled fields in the order they appear, each with its value lines.
fn labeled(lines: &[String]) -> Vec<(Label, Vec<&str>)> {
    let mut fields: Vec<(Label, Vec<&str>)> = Vec::new();
    // Continuation lines only belong to a known label.
    let mut open = false;
    for line in lines {
        if line.starts_with(SECTION_MARKER) {
            break;
        }
        if let Some(rest) = line.strip_prefix(FIELD_MARKER) {
            open = match split_label(rest) {
                Some((label, inline)) => {
                    fields.push((label, if inline.is_empty() { Vec::new() } else { vec![inline] }));
                    true
                },
                None => false,
            };
            continue;
        }
        if open
            && !consts::REFERENCE_REGEX.is_match(line)
            && let Some((_, values)) = fields.last_mut()
        {
            values.push(line.as_str());
        }
    }
    fields
}

fn single(values: &[&str]) -> Option<String> {
    Some(collapse(&values.join(" "))).filter(|value| !value.is_empty())
}

fn fields_and_synopsis(lines: &[String]) -> (DetailFields, Option<String>) {
    let mut fields = DetailFields::default();
    let mut synopsis = None;
    for (label, values) in labeled(lines) {
        let slot = match label {
            Label::TranslatedName => &mut fields.translated_name,
            Label::Name => &mut fields.name,
            Label::Year => &mut fields.year,
            Label::Country => &mut fields.country,
            Label::Genre => &mut fields.genre,
            Label::Language => &mut fields.language,
            Label::Subtitles => &mut fields.subtitles,
            Label::ReleaseDate => &mut fields.release_date,
            Label::DoubanRating => &mut fields.douban_rating,
            Label::ImdbRating => &mut fields.imdb_rating,
            Label::FileFormat => &mut fields.file_format,
            Label::Resolution => &mut fields.resolution,
            Label::Size => &mut fields.size,
            Label::Duration => &mut fields.duration,
            Label::Director => &mut fields.director,
            Label::Cast => {
                if fields.cast.is_empty() {
                    fields.cast = values.iter().map(|v| collapse(v)).filter(|v| !v.is_empty()).collect();
                }
                continue;
            },
            Label::Synopsis => {
                if synopsis.is_none() {
                    synopsis = Some(values.join("\n")).filter(|s| !s.is_empty());
                }
                continue;
            },
        };
        // First occurrence wins, some pages repeat the block.
        if slot.is_none() {
            *slot = single(&values);
        }
    }
    (fields, synopsis)
}

fn references(zoom: ElementRef<'_>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut references = Vec::new();
    for anchor in zoom.select(&consts::ANCHOR_SELECTOR) {
        let text = anchor.text().collect::<String>();
        let candidates = [anchor.value().attr("href"), anchor.value().attr("thunderhref"), Some(text.as_str())];
        let Some(reference) =
            candidates.into_iter().flatten().map(str::trim).find(|c| consts::REFERENCE_REGEX.is_match(c))
        else {
            continue;
        };
        if seen.insert(reference.to_string()) {
            references.push(reference.to_string());
        }
    }
    references
}

pub(crate) fn extract(document: &Html, link: &str, extracted_at: UtcDateTime) -> Result<DetailRecord> {
    let id = require_video_id(link)?;
    let zoom = document
        .select(&consts::DETAIL_CONTAINER_SELECTOR)
        .next()
        .ok_or_raise(|| ErrorKind::InvalidDocument("detail"))?;
    let references = self::references(zoom);
    if references.is_empty() {
        exn::bail!(ErrorKind::MissingField("references"));
    }
    let (fields, synopsis) = fields_and_synopsis(&lines(zoom));
    let heading = document
        .select(&consts::DETAIL_TITLE_SELECTOR)
        .next()
        .map(|h1| collapse(&h1.text().collect::<String>()))
        .filter(|title| !title.is_empty());
    let title = heading.or_else(|| fields.name.clone()).or_else(|| fields.translated_name.clone()).unwrap_or_default();
    let cover = zoom
        .select(&consts::DETAIL_COVER_SELECTOR)
        .find_map(|img| img.value().attr("src"))
        .map(|src| src.trim().to_string())
        .filter(|src| !src.is_empty());
    let published = document
        .select(&consts::BODY_SELECTOR)
        .next()
        .map(|body| body.text().collect::<String>())
        .and_then(|text| consts::PUBLISHED_REGEX.captures(&text).and_then(|c| date_from_captures(&c, 1)));
    Ok(DetailRecord {
        id,
        link: link.trim().to_string(),
        title,
        cover,
        fields,
        synopsis,
        references,
        published,
        extracted_at: Some(extracted_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("译　　名　魅影缝匠/霓裳魅影", Some((Label::TranslatedName, "魅影缝匠/霓裳魅影")))]
    #[case("片　　名　Phantom Thread", Some((Label::Name, "Phantom Thread")))]
    #[case("上映日期　2017-12-25(美国)", Some((Label::ReleaseDate, "2017-12-25(美国)")))]
    #[case("IMDb评分  7.8/10 from 36,201 users", Some((Label::ImdbRating, "7.8/10 from 36,201 users")))]
    #[case("简　　介", Some((Label::Synopsis, "")))]
    #[case("获奖情况", None)]
    #[case("编　　剧　保罗·托马斯·安德森", None)]
    fn test_split_label(#[case] line: &str, #[case] expected: Option<(Label, &str)>) {
        assert_eq!(split_label(line), expected);
    }

    #[test]
    fn test_labeled_stops_at_section_marker() {
        let lines = ["◎简　　介", "第一行", "第二行", "【下载地址】", "◎片　　名　Not Metadata"]
            .map(str::to_string)
            .to_vec();
        let (fields, synopsis) = fields_and_synopsis(&lines);
        assert_eq!(synopsis.as_deref(), Some("第一行\n第二行"));
        assert_eq!(fields.name, None);
    }

    #[test]
    fn test_unknown_label_swallows_its_continuation_lines() {
        let lines = ["◎获奖情况", "第90届奥斯卡金像奖", "◎片　　长　130分钟"].map(str::to_string).to_vec();
        let (fields, synopsis) = fields_and_synopsis(&lines);
        assert_eq!(fields.duration.as_deref(), Some("130分钟"));
        assert_eq!(synopsis, None);
    }

    #[test]
    fn test_missing_references() {
        let html = r#"<div id="Zoom"><p>◎片　　名　Phantom Thread</p></div>"#;
        let err = extract(&Html::parse_document(html), "/html/gndy/dyzz/20180330/56604.html", UtcDateTime::UNIX_EPOCH)
            .unwrap_err();
        assert_eq!(*err, ErrorKind::MissingField("references"));
    }

    #[test]
    fn test_link_without_identifier() {
        let html = r#"<div id="Zoom"><a href="ftp://a/b.mkv">ftp://a/b.mkv</a></div>"#;
        let err = extract(&Html::parse_document(html), "/html/gndy/dyzz/index.html", UtcDateTime::UNIX_EPOCH)
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::ParseError { field: "id", .. }));
    }

    #[test]
    fn test_minimal_detail() {
        let html = r#"<div id="Zoom"><table><tr><td><a href="magnet:?xt=urn:btih:abc">下载</a></td></tr></table></div>"#;
        let detail =
            extract(&Html::parse_document(html), "/html/gndy/dyzz/20180330/56604.html", UtcDateTime::UNIX_EPOCH)
                .unwrap();
        assert_eq!(detail.id, 56604);
        assert_eq!(detail.references, vec!["magnet:?xt=urn:btih:abc"]);
        assert_eq!(detail.title, "");
        assert_eq!(detail.cover, None);
        assert_eq!(detail.fields, DetailFields::default());
        assert!(detail.is_filled());
    }
}
