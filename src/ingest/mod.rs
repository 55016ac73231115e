// src/ingest/mod.rs
pub mod fetch;
pub mod parse;
pub mod timestamp;
pub mod types;

use std::collections::HashSet;

use chrono::{FixedOffset, NaiveDate};
use futures::stream::{self, StreamExt};
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use thiserror::Error;

use crate::ingest::fetch::{FetchError, Fetcher};
use crate::ingest::parse::ParseError;
use crate::ingest::types::{DigestResult, Item, Source, SourceHealth};
use crate::summarize::Summarize;

/// Cap on concurrent outbound feed fetches, to stay polite with remote
/// servers and RSSHub mirrors.
const MAX_CONCURRENT_FETCHES: usize = 6;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "digest_entries_total",
            "Entries parsed from source documents."
        );
        describe_counter!(
            "digest_kept_total",
            "Items kept after date filtering and deduplication."
        );
        describe_counter!("digest_dedup_total", "Items removed by link deduplication.");
        describe_counter!("digest_source_errors_total", "Source fetch/parse failures.");
        describe_histogram!("digest_parse_ms", "Document parse time in milliseconds.");
    });
}

/// Normalize entry text: decode HTML entities, strip tags, collapse
/// whitespace, cap the length.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 4) Length cap: 2000 chars
    if out.chars().count() > 2000 {
        out = out.chars().take(2000).collect();
    }

    out
}

/// Run-fatal conditions only; per-source failures are recovered locally and
/// reported through `DigestResult::health`.
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("no sources configured")]
    NoSources,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// The ingestion core. Owns the HTTP fetcher, the reporting timezone offset,
/// and the ordered summarizer chain.
pub struct Digester {
    fetcher: Fetcher,
    report_offset: FixedOffset,
    summarizers: Vec<Box<dyn Summarize>>,
}

impl Digester {
    pub fn new(report_offset: FixedOffset) -> Self {
        Self {
            fetcher: Fetcher::new(),
            report_offset,
            summarizers: Vec::new(),
        }
    }

    pub fn with_summarizers(mut self, summarizers: Vec<Box<dyn Summarize>>) -> Self {
        self.summarizers = summarizers;
        self
    }

    /// Produce the digest for one calendar date: fetch and parse every
    /// source (bounded concurrency, per-source failure isolation), filter to
    /// the target date in the reporting timezone, deduplicate by link, sort
    /// newest-first, and optionally summarize.
    pub async fn produce_digest(
        &self,
        target_date: NaiveDate,
        sources: &[Source],
    ) -> Result<DigestResult, DigestError> {
        if sources.is_empty() {
            return Err(DigestError::NoSources);
        }
        ensure_metrics_described();

        let mut outcomes: Vec<(usize, &Source, Result<Vec<Item>, SourceError>)> =
            stream::iter(sources.iter().enumerate())
                .map(|(idx, source)| async move { (idx, source, self.ingest_source(source).await) })
                .buffer_unordered(MAX_CONCURRENT_FETCHES)
                .collect()
                .await;
        // buffer_unordered yields in completion order; restore input order so
        // identical inputs always produce identical digests
        outcomes.sort_by_key(|(idx, ..)| *idx);

        let mut all_items = Vec::new();
        let mut health = Vec::with_capacity(sources.len());
        let mut succeeded = 0usize;
        for (_, source, outcome) in outcomes {
            match outcome {
                Ok(items) => {
                    succeeded += 1;
                    health.push(self.health_row(source, &items, target_date));
                    all_items.extend(items);
                }
                Err(err) => {
                    tracing::warn!(source = %source.name, error = %err, "source failed, skipping");
                    counter!("digest_source_errors_total").increment(1);
                    health.push(SourceHealth {
                        name: source.name.clone(),
                        total_items: 0,
                        items_on_date: 0,
                        latest_date: None,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        let mut items = filter_to_date(all_items, self.report_offset, target_date);
        sort_digest_order(&mut items);
        let (items, dropped) = dedupe_by_link(items);
        counter!("digest_dedup_total").increment(dropped as u64);
        counter!("digest_kept_total").increment(items.len() as u64);

        let summary = if items.is_empty() {
            None
        } else {
            self.summarize(target_date, &items).await
        };

        Ok(DigestResult {
            date: target_date,
            items,
            sources_attempted: sources.len(),
            sources_succeeded: succeeded,
            summary,
            health,
        })
    }

    async fn ingest_source(&self, source: &Source) -> Result<Vec<Item>, SourceError> {
        let doc = self.fetcher.fetch(source).await?;
        Ok(parse::parse_document(&doc, source)?)
    }

    fn health_row(&self, source: &Source, items: &[Item], target_date: NaiveDate) -> SourceHealth {
        let latest = items.iter().map(|i| self.local_date(i)).max();
        let on_date = items
            .iter()
            .filter(|i| self.local_date(i) == target_date)
            .count();
        SourceHealth {
            name: source.name.clone(),
            total_items: items.len(),
            items_on_date: on_date,
            latest_date: latest,
            error: None,
        }
    }

    fn local_date(&self, item: &Item) -> NaiveDate {
        item.published_at
            .with_timezone(&self.report_offset)
            .date_naive()
    }

    async fn summarize(&self, date: NaiveDate, items: &[Item]) -> Option<String> {
        for summarizer in &self.summarizers {
            match summarizer.try_summarize(date, items).await {
                Ok(text) => return Some(text),
                Err(err) => tracing::warn!(
                    summarizer = summarizer.name(),
                    error = %err,
                    "summarizer unavailable, falling through"
                ),
            }
        }
        None
    }
}

/// Keep only items whose calendar date in the reporting timezone equals the
/// target date exactly. No "last 24h" approximation: vendors in different
/// timezones must align on the report audience's wall-clock day.
pub fn filter_to_date(items: Vec<Item>, offset: FixedOffset, target_date: NaiveDate) -> Vec<Item> {
    items
        .into_iter()
        .filter(|item| item.published_at.with_timezone(&offset).date_naive() == target_date)
        .collect()
}

/// Newest first; equal timestamps ordered by source name, then link, so the
/// digest is deterministic.
pub fn sort_digest_order(items: &mut [Item]) {
    items.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| a.link.cmp(&b.link))
    });
}

/// Deduplicate by exact link match, keeping the first occurrence. Returns the
/// survivors and the dropped count.
pub fn dedupe_by_link(items: Vec<Item>) -> (Vec<Item>, usize) {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    let mut keep = Vec::with_capacity(items.len());
    let mut dropped = 0usize;
    for item in items {
        if !seen.insert(item.link.clone()) {
            dropped += 1;
            continue;
        }
        keep.push(item);
    }
    (keep, dropped)
}
