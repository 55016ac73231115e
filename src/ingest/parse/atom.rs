// src/ingest/parse/atom.rs
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::normalize_text;
use crate::ingest::parse::{scrub_html_entities_for_xml, ParseError};
use crate::ingest::timestamp::parse_timestamp_with_default;
use crate::ingest::types::{Item, Source};

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    title: Option<TextNode>,
    #[serde(rename = "link", default)]
    links: Vec<Link>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<TextNode>,
    content: Option<TextNode>,
}

// Atom text constructs carry a `type` attribute, so the content has to be
// read from the `$text` key rather than the element itself.
#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

fn pick_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .and_then(|l| l.href.as_deref())
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string)
}

pub fn parse(source: &Source, body: &str) -> Result<Vec<Item>, ParseError> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(body);
    let feed: Feed = from_str(&xml_clean).map_err(|e| ParseError::Malformed {
        format: "atom",
        detail: e.to_string(),
    })?;

    let default_offset = source.utc_offset();
    let mut out = Vec::with_capacity(feed.entries.len());
    for entry in feed.entries {
        let title = entry
            .title
            .as_ref()
            .and_then(|t| t.value.as_deref())
            .map(normalize_text)
            .unwrap_or_default();
        let link = pick_link(&entry.links);
        let (title, link) = match (title.is_empty(), link) {
            (false, Some(link)) => (title, link),
            _ => {
                tracing::debug!(source = %source.name, "dropping atom entry without title or link");
                continue;
            }
        };

        let raw_date = entry.published.or(entry.updated);
        let published_at = match raw_date
            .as_deref()
            .map(|d| parse_timestamp_with_default(d, default_offset))
        {
            Some(Ok(dt)) => dt,
            _ => {
                tracing::debug!(
                    source = %source.name,
                    title = %title,
                    "dropping atom entry without usable publish date"
                );
                continue;
            }
        };

        let summary = entry
            .summary
            .and_then(|t| t.value)
            .or_else(|| entry.content.and_then(|t| t.value));
        let summary = summary
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
    use chrono::{TimeZone, Utc};

    fn source() -> Source {
        Source {
            name: "Vendor".into(),
            feed_url: "https://vendor.test/atom.xml".into(),
            site_url: None,
            timezone: None,
            tags: Vec::new(),
            fallback: None,
        }
    }

    #[test]
    fn alternate_link_and_published_date_win() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title type="text">Release notes</title>
    <link rel="self" href="https://vendor.test/entry.atom"/>
    <link rel="alternate" href="https://vendor.test/blog/release"/>
    <published>2025-03-04T09:30:00Z</published>
    <updated>2025-03-05T00:00:00Z</updated>
    <summary type="html">A &lt;b&gt;big&lt;/b&gt; release</summary>
  </entry>
</feed>"#;
        let items = parse(&source(), xml).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://vendor.test/blog/release");
        assert_eq!(
            items[0].published_at,
            Utc.with_ymd_and_hms(2025, 3, 4, 9, 30, 0).unwrap()
        );
        assert_eq!(items[0].summary.as_deref(), Some("A big release"));
    }

    #[test]
    fn updated_is_the_fallback_date() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title>Only updated</title>
    <link href="https://vendor.test/x"/>
    <updated>2025-03-04T10:00:00Z</updated>
  </entry>
</feed>"#;
        let items = parse(&source(), xml).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].published_at,
            Utc.with_ymd_and_hms(2025, 3, 4, 10, 0, 0).unwrap()
        );
    }
}
