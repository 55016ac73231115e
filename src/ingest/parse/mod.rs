// src/ingest/parse/mod.rs
pub mod atom;
pub mod html;
pub mod json;
pub mod rss;

use thiserror::Error;
use url::Url;

use crate::ingest::types::{FeedFormat, Item, RawFeedDocument, Source};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed {format} document: {detail}")]
    Malformed {
        format: &'static str,
        detail: String,
    },
    #[error("unparseable timestamp: {0:?}")]
    Timestamp(String),
    #[error("invalid selector: {0:?}")]
    Selector(String),
    #[error("fallback document has no extraction rule")]
    MissingRule,
}

/// Sniff the payload format from the leading bytes. `None` means the body is
/// not recognizable as any supported format.
pub fn detect_format(body: &[u8]) -> Option<FeedFormat> {
    let head = String::from_utf8_lossy(&body[..body.len().min(1024)]);
    let head = head.trim_start_matches('\u{feff}').trim_start();
    if head.starts_with('{') || head.starts_with('[') {
        return Some(FeedFormat::Json);
    }
    let lower = head.to_ascii_lowercase();
    if lower.contains("<rss") {
        return Some(FeedFormat::Rss);
    }
    if lower.contains("<feed") {
        return Some(FeedFormat::Atom);
    }
    if lower.contains("<html") || lower.contains("<!doctype html") {
        return Some(FeedFormat::Html);
    }
    None
}

/// Convert raw fetched content into normalized items. Entries missing a title
/// or link are dropped (logged, not fatal); entries whose publish date fails
/// to normalize are dropped for the same reason.
pub fn parse_document(doc: &RawFeedDocument, source: &Source) -> Result<Vec<Item>, ParseError> {
    let body = String::from_utf8_lossy(&doc.body);
    match doc.format {
        FeedFormat::Rss => rss::parse(source, &body),
        FeedFormat::Atom => atom::parse(source, &body),
        FeedFormat::Html => {
            let rule = doc.rule.as_ref().ok_or(ParseError::MissingRule)?;
            html::parse(source, rule, &body)
        }
        FeedFormat::Json => {
            let rule = doc.rule.as_ref().ok_or(ParseError::MissingRule)?;
            json::parse(source, rule, &body)
        }
    }
}

/// Resolve a possibly-relative entry link. Absolute links pass through;
/// relative ones are joined onto the configured prefix. A relative link with
/// no prefix is kept as-is, matching what the RSSHub transforms emit.
pub(crate) fn absolutize_link(link: &str, prefix: Option<&str>) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }
    match prefix {
        Some(prefix) if !link.starts_with("http") => Url::parse(prefix)
            .ok()?
            .join(link)
            .ok()
            .map(|u| u.to_string()),
        _ => Some(link.to_string()),
    }
}

/// Replace HTML entities that are not valid XML before handing a feed to the
/// strict XML deserializer. Upstream feeds embed these unescaped.
pub(crate) fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_format_covers_supported_payloads() {
        assert_eq!(
            detect_format(b"<?xml version=\"1.0\"?><rss version=\"2.0\">"),
            Some(FeedFormat::Rss)
        );
        assert_eq!(
            detect_format(b"<feed xmlns=\"http://www.w3.org/2005/Atom\">"),
            Some(FeedFormat::Atom)
        );
        assert_eq!(
            detect_format(b"<!DOCTYPE html><html><body>403</body></html>"),
            Some(FeedFormat::Html)
        );
        assert_eq!(detect_format(b"{\"data\": []}"), Some(FeedFormat::Json));
        assert_eq!(detect_format(b"plain text"), None);
    }

    #[test]
    fn entity_scrub_keeps_xml_parseable() {
        let scrubbed = scrub_html_entities_for_xml("a&nbsp;b &ldquo;c&rdquo;");
        assert_eq!(scrubbed, "a b \"c\"");
    }
}
