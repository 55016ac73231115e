// src/summarize/extractive.rs
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate};

use super::{Summarize, SummarizeError};
use crate::ingest::types::Item;

const EXCERPT_LIMIT: usize = 240;

/// Non-generative fallback: renders the item titles and links as a
/// grouped bilingual list. Always succeeds, so a digest is produced even
/// when no AI provider is configured or reachable.
pub struct ExtractiveSummarizer {
    offset: FixedOffset,
}

impl ExtractiveSummarizer {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    fn push_section(&self, grouped: &BTreeMap<&str, Vec<&Item>>, lines: &mut Vec<String>) {
        for (source, items) in grouped {
            lines.push(format!("### {source}"));
            for item in items {
                let stamp = item
                    .published_at
                    .with_timezone(&self.offset)
                    .format("%Y-%m-%d %H:%M");
                let excerpt = item
                    .summary
                    .as_deref()
                    .map(|s| format!(" - {}", truncate(s, EXCERPT_LIMIT)))
                    .unwrap_or_default();
                lines.push(format!("- [{}]({}) ({stamp}){excerpt}", item.title, item.link));
            }
            lines.push(String::new());
        }
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let head: String = text.chars().take(limit.saturating_sub(3)).collect();
    format!("{}...", head.trim_end())
}

#[async_trait]
impl Summarize for ExtractiveSummarizer {
    async fn try_summarize(
        &self,
        _date: NaiveDate,
        items: &[Item],
    ) -> Result<String, SummarizeError> {
        let mut grouped: BTreeMap<&str, Vec<&Item>> = BTreeMap::new();
        for item in items {
            grouped.entry(item.source.as_str()).or_default().push(item);
        }

        let mut lines = vec!["## English".to_string()];
        self.push_section(&grouped, &mut lines);
        lines.push("## 中文".to_string());
        self.push_section(&grouped, &mut lines);

        Ok(format!("{}\n", lines.join("\n").trim_end()))
    }

    fn name(&self) -> &'static str {
        "extractive"
    }
}
