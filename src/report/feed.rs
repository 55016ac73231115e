// src/report/feed.rs
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use regex::Regex;

use crate::ingest::types::Item;

const SUMMARY_LIMIT: usize = 12_000;

static DAILY_REPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}\.md$").unwrap());

pub struct ChannelMeta<'a> {
    pub title: &'a str,
    pub link: &'a str,
    pub description: &'a str,
    pub self_link: Option<&'a str>,
}

fn write_text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Serialize the aggregated feed as RSS 2.0.
pub fn build_feed(items: &[Item], meta: &ChannelMeta<'_>) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut rss_start = BytesStart::new("rss");
    rss_start.push_attribute(("version", "2.0"));
    rss_start.push_attribute(("xmlns:atom", "http://www.w3.org/2005/Atom"));
    writer.write_event(Event::Start(rss_start))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;
    write_text_element(&mut writer, "title", meta.title)?;
    write_text_element(&mut writer, "link", meta.link)?;
    write_text_element(&mut writer, "description", meta.description)?;

    if let Some(self_link) = meta.self_link {
        let mut atom_link = BytesStart::new("atom:link");
        atom_link.push_attribute(("href", self_link));
        atom_link.push_attribute(("rel", "self"));
        atom_link.push_attribute(("type", "application/rss+xml"));
        writer.write_event(Event::Empty(atom_link))?;
    }

    for item in items {
        writer.write_event(Event::Start(BytesStart::new("item")))?;
        write_text_element(&mut writer, "title", &item.title)?;
        write_text_element(&mut writer, "link", &item.link)?;
        write_text_element(&mut writer, "guid", &item.link)?;
        write_text_element(&mut writer, "pubDate", &item.published_at.to_rfc2822())?;
        if let Some(summary) = &item.summary {
            write_text_element(&mut writer, "description", summary)?;
        }
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    let xml = String::from_utf8(writer.into_inner()).context("feed xml is utf-8")?;
    Ok(format!("{xml}\n"))
}

/// Rebuild the aggregated feed entries from the daily reports on disk: one
/// entry per `YYYY-MM-DD.md` file, newest first, bounded by `limit`.
pub fn collect_daily_entries(
    output_dir: &Path,
    repo_slug: &str,
    offset: FixedOffset,
    limit: usize,
) -> Result<Vec<Item>> {
    if !output_dir.exists() {
        return Ok(Vec::new());
    }

    let mut names: Vec<String> = Vec::new();
    for entry in fs::read_dir(output_dir)
        .with_context(|| format!("reading {}", output_dir.display()))?
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_file() && DAILY_REPORT_RE.is_match(&name) {
            names.push(name);
        }
    }
    names.sort();
    names.reverse();

    let mut items = Vec::new();
    for name in names.into_iter().take(limit.max(1)) {
        let stem = name.trim_end_matches(".md");
        let Ok(report_date) = NaiveDate::parse_from_str(stem, "%Y-%m-%d") else {
            continue;
        };

        let link = if repo_slug.is_empty() {
            "https://github.com/".to_string()
        } else {
            format!("https://github.com/{repo_slug}/blob/master/data/daily/{name}")
        };

        let content = fs::read_to_string(output_dir.join(&name))
            .with_context(|| format!("reading report {name}"))?;
        let body = strip_report_header(&content);
        let summary = if body.is_empty() {
            "No digest content.".to_string()
        } else {
            truncate(&body, SUMMARY_LIMIT)
        };

        let Some(noon) = report_date.and_hms_opt(12, 0, 0) else {
            continue;
        };
        let Some(published_at) = offset.from_local_datetime(&noon).single() else {
            continue;
        };

        items.push(Item {
            source: "Daily Digest".to_string(),
            title: format!("Daily Digest / 日报摘要 ({report_date})"),
            link,
            published_at: published_at.with_timezone(&Utc),
            summary: Some(summary),
            tags: Vec::new(),
        });
    }
    Ok(items)
}

fn strip_report_header(content: &str) -> String {
    let mut lines: Vec<&str> = content.lines().collect();
    if lines.first().is_some_and(|l| l.starts_with("# ")) {
        lines.remove(0);
        if lines.first().is_some_and(|l| l.trim().is_empty()) {
            lines.remove(0);
        }
    }
    lines.join("\n").trim().to_string()
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let head: String = text.chars().take(limit.saturating_sub(3)).collect();
    format!("{}...", head.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn feed_escapes_text_and_carries_guid() {
        let items = vec![Item {
            source: "Daily Digest".into(),
            title: "A & B <launch>".into(),
            link: "https://example.test/a?x=1&y=2".into(),
            published_at: Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap(),
            summary: Some("1 < 2".into()),
            tags: Vec::new(),
        }];
        let meta = ChannelMeta {
            title: "LLM Vendor Daily Digest",
            link: "https://github.com/acme/llm-vendor-daily",
            description: "Bilingual daily digests generated from vendor sources.",
            self_link: Some("https://raw.githubusercontent.com/acme/llm-vendor-daily/master/feed.xml"),
        };
        let xml = build_feed(&items, &meta).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("A &amp; B &lt;launch&gt;"));
        assert!(xml.contains("<guid>https://example.test/a?x=1&amp;y=2</guid>"));
        assert!(xml.contains("rel=\"self\""));
        assert!(xml.contains("<pubDate>Tue, 4 Mar 2025 12:00:00 +0000</pubDate>"));
    }

    #[test]
    fn header_strip_drops_title_and_blank() {
        let content = "# Daily Digest (2025-03-04)\n\n## English\n- item\n";
        assert_eq!(strip_report_header(content), "## English\n- item");
    }
}
