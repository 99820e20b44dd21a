//! Tolerant RSS item extraction.
//!
//! Real-world feeds routinely break the XML rules (unescaped ampersands,
//! raw HTML in descriptions, truncated documents), so items are pulled out
//! field by field with regexes instead of a strict parser. Nothing here
//! returns an error: unusable items are simply not emitted.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

use crate::models::RawFeedItem;

fn item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<item\b[^>]*>(.*?)</item>").unwrap())
}

fn cdata_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap())
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").unwrap())
}

// Only things that look like markup, so "a < b" in decoded text survives.
fn markup_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)</?[a-zA-Z][^>]*>").unwrap())
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").unwrap())
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<link\b[^>]*>(.*?)</link>").unwrap())
}

fn link_href_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?is)<link\b[^>]*\bhref=["']([^"']+)["']"#).unwrap())
}

fn guid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<guid\b[^>]*>(.*?)</guid>").unwrap())
}

fn description_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<description\b[^>]*>(.*?)</description>").unwrap())
}

fn encoded_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<content:encoded\b[^>]*>(.*?)</content:encoded>").unwrap())
}

fn pub_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<pubDate\b[^>]*>(.*?)</pubDate>").unwrap())
}

fn media_content_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<media:content\b[^>]*\burl=["']([^"']+)["']"#).unwrap()
    })
}

fn enclosure_type_first_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<enclosure\b[^>]*\btype=["']image/[^"']*["'][^>]*\burl=["']([^"']+)["']"#)
            .unwrap()
    })
}

fn enclosure_url_first_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<enclosure\b[^>]*\burl=["']([^"']+)["'][^>]*\btype=["']image/"#)
            .unwrap()
    })
}

fn img_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?is)<img\b[^>]*\bsrc=["']([^"']+)["']"#).unwrap())
}

/// Lazily yield every usable `<item>` in `text`, in document order.
pub fn parse_items(text: &str) -> impl Iterator<Item = RawFeedItem> + '_ {
    item_re()
        .captures_iter(text)
        .filter_map(|cap| cap.get(1).and_then(|m| parse_item(m.as_str())))
}

fn parse_item(block: &str) -> Option<RawFeedItem> {
    let title = capture(title_re(), block).map(|t| clean_text(&t)).unwrap_or_default();
    let link = extract_link(block).unwrap_or_default();

    if title.is_empty() || link.is_empty() {
        return None;
    }

    let raw_description = capture(description_re(), block)
        .filter(|d| !unwrap_cdata(d).trim().is_empty())
        .or_else(|| capture(encoded_re(), block))
        .map(|d| unwrap_cdata(&d))
        .unwrap_or_default();

    // clean_text decodes entities exactly once.
    let description = clean_text(&raw_description);

    let pub_date = capture(pub_date_re(), block)
        .map(|d| clean_text(&d))
        .filter(|d| !d.is_empty());

    let image_url = extract_image(block, &decode_entities(&raw_description));

    Some(RawFeedItem {
        title,
        link,
        description,
        pub_date,
        image_url,
    })
}

fn capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

fn extract_link(block: &str) -> Option<String> {
    let from_text = capture(link_re(), block).map(|l| clean_text(&l));
    let from_href = || capture(link_href_re(), block).map(|l| decode_entities(l.trim()));
    let from_guid = || {
        capture(guid_re(), block)
            .map(|g| clean_text(&g))
            .filter(|g| g.starts_with("http://") || g.starts_with("https://"))
    };

    from_text
        .filter(|l| !l.is_empty())
        .or_else(from_href)
        .filter(|l| !l.is_empty())
        .or_else(from_guid)
}

/// First image found, in priority order: media:content, typed enclosure,
/// inline `<img>` in the description.
fn extract_image(block: &str, description_html: &str) -> Option<String> {
    capture(media_content_re(), block)
        .or_else(|| capture(enclosure_type_first_re(), block))
        .or_else(|| capture(enclosure_url_first_re(), block))
        .or_else(|| capture(img_re(), description_html))
        .map(|url| decode_entities(url.trim()))
        .filter(|url| !url.is_empty())
}

fn unwrap_cdata(s: &str) -> String {
    cdata_re().replace_all(s, "$1").into_owned()
}

/// Unwrap CDATA, drop markup, decode entities and collapse whitespace.
pub fn clean_text(raw: &str) -> String {
    let unwrapped = unwrap_cdata(raw);
    let stripped = tag_re().replace_all(&unwrapped, " ");
    let decoded = decode_entities(&stripped);
    // Descriptions that were entity-encoded HTML only show their tags now.
    let stripped_again = markup_re().replace_all(&decoded, " ");
    whitespace_re()
        .replace_all(stripped_again.trim(), " ")
        .into_owned()
}

pub fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Normalise a feed-supplied date. Anything unparsable becomes `now`.
pub fn normalize_publish_date(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    raw.and_then(parse_feed_date).unwrap_or(now)
}

fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%a, %d %b %Y %H:%M:%S %z", "%d %b %Y %H:%M:%S %z", "%Y-%m-%d %H:%M:%S %z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    // Unknown zone abbreviations ("MYT", "IST"): drop them and read as UTC.
    let without_zone = match raw.rsplit_once(' ') {
        Some((head, tail)) if tail.chars().all(|c| c.is_ascii_alphabetic()) => head,
        _ => raw,
    };
    for fmt in [
        "%a, %d %b %Y %H:%M:%S",
        "%d %b %Y %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(without_zone, fmt) {
            return Some(naive.and_utc());
        }
    }

    None
}
