// src/ingest/types.rs
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// One configured vendor feed. Loaded once from configuration and immutable
/// for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    #[serde(rename = "feed")]
    pub feed_url: String,
    #[serde(rename = "site", default)]
    pub site_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// UTC offset ("+08:00") applied to this source's timestamps when they
    /// carry no timezone of their own. Absent means UTC.
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub fallback: Option<FallbackRule>,
}

impl Source {
    pub fn utc_offset(&self) -> Option<FixedOffset> {
        self.timezone.as_deref().and_then(|tz| tz.parse().ok())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FallbackKind {
    Html,
    Json,
}

/// Extraction rule for a fallback document: where the repeating entries live
/// and how each field is pulled out of one entry.
///
/// For HTML the fields are CSS selectors (attribute overrides via `*_attr`);
/// for JSON, `item` is a dotted path to the entry array and the other fields
/// are object keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FallbackRule {
    pub kind: FallbackKind,
    pub url: String,
    pub item: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub link_attr: Option<String>,
    #[serde(default)]
    pub link_prefix: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub date_attr: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub desc_attr: Option<String>,
}

impl FallbackRule {
    /// Derive a rule from an RSSHub `/transform/html` or `/transform/json`
    /// feed URL. The transform query string carries the target page URL plus
    /// the extraction parameters (`item`, `itemTitle`, `itemLink`, ...).
    pub fn from_rsshub_url(feed_url: &str) -> Option<Self> {
        let kind = if feed_url.contains("/transform/html") {
            FallbackKind::Html
        } else if feed_url.contains("/transform/json") {
            FallbackKind::Json
        } else {
            return None;
        };

        let parsed = Url::parse(feed_url).ok()?;
        let mut target = None;
        let mut rule = FallbackRule {
            kind,
            url: String::new(),
            item: String::new(),
            title: None,
            link: None,
            link_attr: None,
            link_prefix: None,
            date: None,
            date_attr: None,
            desc: None,
            desc_attr: None,
        };
        for (key, value) in parsed.query_pairs() {
            if value.is_empty() {
                continue;
            }
            let value = value.into_owned();
            match key.as_ref() {
                "url" => target = Some(value),
                "item" => rule.item = value,
                "itemTitle" => rule.title = Some(value),
                "itemLink" => rule.link = Some(value),
                "itemLinkAttr" => rule.link_attr = Some(value),
                "itemLinkPrefix" => rule.link_prefix = Some(value),
                "itemPubDate" => rule.date = Some(value),
                "itemPubDateAttr" => rule.date_attr = Some(value),
                "itemDesc" => rule.desc = Some(value),
                "itemDescAttr" => rule.desc_attr = Some(value),
                _ => {}
            }
        }
        rule.url = target?;
        if rule.item.is_empty() {
            return None;
        }
        Some(rule)
    }
}

/// Format hint attached to fetched bytes so the parser knows which
/// decoder to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Rss,
    Atom,
    Html,
    Json,
}

/// Raw fetched content for one source. Transient; discarded after parsing.
#[derive(Debug)]
pub struct RawFeedDocument {
    pub source: String,
    pub format: FeedFormat,
    pub body: Vec<u8>,
    /// Present on fallback documents; tells the parser how to extract entries.
    pub rule: Option<FallbackRule>,
}

/// One normalized feed entry. Value object: no mutation after creation.
/// Items whose publish date cannot be resolved are rejected at parse time,
/// never retained with a placeholder date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub source: String,
    pub title: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Per-source outcome of one run, for the post-run health report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceHealth {
    pub name: String,
    pub total_items: usize,
    pub items_on_date: usize,
    pub latest_date: Option<NaiveDate>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    Ok,
    Stale,
    Empty,
    Error,
}

impl SourceHealth {
    pub fn status(&self, report_date: NaiveDate, stale_days: i64) -> SourceStatus {
        if self.error.is_some() {
            return SourceStatus::Error;
        }
        let Some(latest) = self.latest_date else {
            return SourceStatus::Empty;
        };
        if self.total_items == 0 {
            return SourceStatus::Empty;
        }
        let age_days = (report_date - latest).num_days().max(0);
        if age_days > stale_days.max(0) {
            SourceStatus::Stale
        } else {
            SourceStatus::Ok
        }
    }
}

/// The output of one run: date-filtered items sorted newest-first, the
/// per-source health rows, and the optional generated summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DigestResult {
    pub date: NaiveDate,
    pub items: Vec<Item>,
    pub sources_attempted: usize,
    pub sources_succeeded: usize,
    pub summary: Option<String>,
    pub health: Vec<SourceHealth>,
}
