// src/ingest/parse/rss.rs
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::normalize_text;
use crate::ingest::parse::{scrub_html_entities_for_xml, ParseError};
use crate::ingest::timestamp::parse_timestamp_with_default;
use crate::ingest::types::{Item, Source};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    // Dublin Core alias some feeds use instead of pubDate
    #[serde(rename = "dc:date")]
    dc_date: Option<String>,
    description: Option<String>,
}

pub fn parse(source: &Source, body: &str) -> Result<Vec<Item>, ParseError> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(body);
    let rss: Rss = from_str(&xml_clean).map_err(|e| ParseError::Malformed {
        format: "rss",
        detail: e.to_string(),
    })?;

    let default_offset = source.utc_offset();
    let mut out = Vec::with_capacity(rss.channel.items.len());
    for entry in rss.channel.items {
        let title = entry
            .title
            .as_deref()
            .map(normalize_text)
            .unwrap_or_default();
        let link = entry
            .link
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if title.is_empty() || link.is_empty() {
            tracing::debug!(source = %source.name, "dropping rss entry without title or link");
            continue;
        }

        let raw_date = entry.pub_date.or(entry.dc_date);
        let published_at = match raw_date
            .as_deref()
            .map(|d| parse_timestamp_with_default(d, default_offset))
        {
            Some(Ok(dt)) => dt,
            _ => {
                tracing::debug!(
                    source = %source.name,
                    title = %title,
                    "dropping rss entry without usable publish date"
                );
                continue;
            }
        };

        let summary = entry
            .description
            .as_deref()
            .map(normalize_text)
            .filter(|s| !s.is_empty());

        out.push(Item {
            source: source.name.clone(),
            title,
            link,
            published_at,
            summary,
            tags: source.tags.clone(),
        });
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("digest_parse_ms").record(ms);
    counter!("digest_entries_total").increment(out.len() as u64);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Source {
        Source {
            name: "Vendor".into(),
            feed_url: "https://vendor.test/feed.xml".into(),
            site_url: None,
            timezone: None,
            tags: vec!["vendor".into()],
            fallback: None,
        }
    }

    #[test]
    fn entries_without_title_or_link_are_dropped() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Vendor</title>
  <item>
    <title>Kept</title>
    <link>https://vendor.test/a</link>
    <pubDate>Tue, 04 Mar 2025 09:30:00 GMT</pubDate>
    <description>New&nbsp;release</description>
  </item>
  <item>
    <title>No link</title>
    <pubDate>Tue, 04 Mar 2025 10:00:00 GMT</pubDate>
  </item>
</channel></rss>"#;
        let items = parse(&source(), xml).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Kept");
        assert_eq!(items[0].summary.as_deref(), Some("New release"));
        assert_eq!(items[0].tags, vec!["vendor".to_string()]);
    }

    #[test]
    fn entries_with_bad_dates_are_dropped() {
        let xml = r#"<rss version="2.0"><channel>
  <item><title>A</title><link>https://vendor.test/a</link><pubDate>whenever</pubDate></item>
  <item><title>B</title><link>https://vendor.test/b</link></item>
</channel></rss>"#;
        let items = parse(&source(), xml).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let err = parse(&source(), "<rss><channel><item></rss>").unwrap_err();
        assert!(matches!(err, ParseError::Malformed { format: "rss", .. }));
    }
}
