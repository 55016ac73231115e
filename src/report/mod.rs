// src/report/mod.rs
pub mod feed;

use chrono::NaiveDate;

use crate::ingest::types::{DigestResult, SourceHealth, SourceStatus};

/// Render the daily markdown report for one digest. The body is the
/// generated summary when one exists; an empty day gets the bilingual
/// "no items" line.
pub fn render_markdown(digest: &DigestResult) -> String {
    let header = format!("# Daily Digest / 日报摘要 ({})\n\n", digest.date);
    let body = match &digest.summary {
        Some(summary) => summary.clone(),
        None => "No items found for this date. / 当日未找到相关条目。\n".to_string(),
    };
    format!("{header}{body}")
}

/// Log the per-source health table after a run: one row per source plus a
/// summary line, sorted by source name.
pub fn log_source_health(health: &[SourceHealth], report_date: NaiveDate, stale_days: i64) {
    let mut rows: Vec<&SourceHealth> = health.iter().collect();
    rows.sort_by_key(|r| r.name.to_lowercase());

    let mut stale = 0usize;
    let mut empty = 0usize;
    let mut errors = 0usize;
    for row in &rows {
        let status = row.status(report_date, stale_days);
        let status_str = match status {
            SourceStatus::Ok => "ok",
            SourceStatus::Stale => {
                stale += 1;
                "stale"
            }
            SourceStatus::Empty => {
                empty += 1;
                "empty"
            }
            SourceStatus::Error => {
                errors += 1;
                "error"
            }
        };
        let latest = row
            .latest_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        let age_days = row
            .latest_date
            .map(|d| (report_date - d).num_days().max(0).to_string())
            .unwrap_or_else(|| "-".to_string());
        tracing::info!(
            target: "health",
            source = %row.name,
            status = status_str,
            total = row.total_items,
            on_date = row.items_on_date,
            latest = %latest,
            age_days = %age_days,
            error = row.error.as_deref().unwrap_or(""),
            "source health"
        );
    }
    tracing::info!(
        target: "health",
        sources = rows.len(),
        stale,
        empty,
        errors,
        stale_days = stale_days.max(0),
        "health summary"
    );
}
