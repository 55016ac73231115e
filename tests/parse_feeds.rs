// tests/parse_feeds.rs
use chrono::{TimeZone, Utc};
use llm_vendor_daily::ingest::parse::{detect_format, parse_document};
use llm_vendor_daily::ingest::types::{
    FallbackKind, FallbackRule, FeedFormat, RawFeedDocument, Source,
};

const RSS_XML: &str = include_str!("fixtures/vendor_rss.xml");
const ATOM_XML: &str = include_str!("fixtures/vendor_atom.xml");
const HTML_PAGE: &str = include_str!("fixtures/vendor_page.html");
const JSON_FEED: &str = include_str!("fixtures/vendor_feed.json");

fn source(name: &str) -> Source {
    Source {
        name: name.to_string(),
        feed_url: format!("https://{}.test/feed", name.to_lowercase()),
        site_url: None,
        timezone: None,
        tags: vec!["vendor".to_string()],
        fallback: None,
    }
}

fn document(source: &Source, format: FeedFormat, body: &str, rule: Option<FallbackRule>) -> RawFeedDocument {
    RawFeedDocument {
        source: source.name.clone(),
        format,
        body: body.as_bytes().to_vec(),
        rule,
    }
}

#[test]
fn rss_fixture_parses_and_drops_invalid_entries() {
    let src = source("Vendor");
    assert_eq!(detect_format(RSS_XML.as_bytes()), Some(FeedFormat::Rss));

    let items = parse_document(&document(&src, FeedFormat::Rss, RSS_XML, None), &src).unwrap();
    // 4 entries in the fixture: one without a link and one with a bad date are dropped
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "Frontier model ships");
    assert_eq!(
        items[0].published_at,
        Utc.with_ymd_and_hms(2025, 3, 4, 18, 30, 0).unwrap()
    );
    assert_eq!(
        items[0].summary.as_deref(),
        Some("The new frontier model is out.")
    );
    assert_eq!(
        items[1].published_at,
        Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap()
    );
    assert!(items.iter().all(|i| i.source == "Vendor"));
    assert!(items.iter().all(|i| i.tags == vec!["vendor".to_string()]));
}

#[test]
fn atom_fixture_prefers_alternate_link_and_published_date() {
    let src = source("Research");
    assert_eq!(detect_format(ATOM_XML.as_bytes()), Some(FeedFormat::Atom));

    let items = parse_document(&document(&src, FeedFormat::Atom, ATOM_XML, None), &src).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].link, "https://vendor.test/research/scaling");
    assert_eq!(
        items[0].published_at,
        Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap()
    );
    assert_eq!(items[0].summary.as_deref(), Some("We scaled further."));
    // second entry has no <published>; <updated> (+08:00) is the fallback
    assert_eq!(
        items[1].published_at,
        Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap()
    );
    assert_eq!(items[1].summary.as_deref(), Some("Body text."));
}

#[test]
fn html_fallback_uses_selector_rule() {
    let src = source("Anthropic");
    let rule = FallbackRule {
        kind: FallbackKind::Html,
        url: "https://anthropic.test/news".into(),
        item: "article".into(),
        title: Some("h3".into()),
        link: Some("a".into()),
        link_attr: None,
        link_prefix: Some("https://anthropic.test".into()),
        date: None,
        date_attr: None,
        desc: Some("p.teaser".into()),
        desc_attr: None,
    };
    let items = parse_document(
        &document(&src, FeedFormat::Html, HTML_PAGE, Some(rule)),
        &src,
    )
    .unwrap();
    // the undated article is dropped
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "Assistant update");
    assert_eq!(items[0].link, "https://anthropic.test/news/assistant-update");
    assert_eq!(items[0].summary.as_deref(), Some("The assistant got faster."));
}

#[test]
fn html_fallback_without_rule_is_an_error() {
    let src = source("Anthropic");
    let err = parse_document(&document(&src, FeedFormat::Html, HTML_PAGE, None), &src);
    assert!(err.is_err());
}

#[test]
fn json_fallback_uses_key_rule() {
    let src = source("Mistral");
    let rule = FallbackRule {
        kind: FallbackKind::Json,
        url: "https://mistral.test/api/news".into(),
        item: "data.posts".into(),
        title: Some("headline".into()),
        link: Some("path".into()),
        link_attr: None,
        link_prefix: Some("https://mistral.test".into()),
        date: Some("publishedAt".into()),
        date_attr: None,
        desc: Some("teaser".into()),
        desc_attr: None,
    };
    let items = parse_document(
        &document(&src, FeedFormat::Json, JSON_FEED, Some(rule)),
        &src,
    )
    .unwrap();
    // the entry without a path is dropped
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "API v2");
    assert_eq!(items[0].link, "https://mistral.test/news/api-v2");
}
