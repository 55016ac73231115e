// src/ingest/parse/json.rs
use metrics::{counter, histogram};
use serde_json::Value;

use crate::ingest::normalize_text;
use crate::ingest::parse::{absolutize_link, ParseError};
use crate::ingest::timestamp::parse_timestamp_with_default;
use crate::ingest::types::{FallbackRule, Item, Source};

fn json_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = data;
    for part in path.split('.') {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn string_field(entry: &Value, key: Option<&str>) -> Option<String> {
    let value = entry.as_object()?.get(key?)?;
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Extract items from a JSON fallback endpoint using the source's configured
/// key rule. `rule.item` is a dotted path to the entry array.
pub fn parse(source: &Source, rule: &FallbackRule, body: &str) -> Result<Vec<Item>, ParseError> {
    let t0 = std::time::Instant::now();
    let data: Value = serde_json::from_str(body).map_err(|e| ParseError::Malformed {
        format: "json",
        detail: e.to_string(),
    })?;

    let Some(entries) = json_path(&data, &rule.item).and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    let default_offset = source.utc_offset();
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        let title = string_field(entry, rule.title.as_deref())
            .map(|t| normalize_text(&t))
            .filter(|t| !t.is_empty());
        let link = string_field(entry, rule.link.as_deref())
            .and_then(|l| absolutize_link(&l, rule.link_prefix.as_deref()));
        let (Some(title), Some(link)) = (title, link) else {
            tracing::debug!(source = %source.name, "dropping json entry without title or link");
            continue;
        };

        let raw_date = string_field(entry, rule.date.as_deref());
        let published_at = match raw_date
            .as_deref()
            .map(|d| parse_timestamp_with_default(d, default_offset))
        {
            Some(Ok(dt)) => dt,
            _ => {
                tracing::debug!(
                    source = %source.name,
                    title = %title,
                    "dropping json entry without usable publish date"
                );
                continue;
            }
        };

        let summary = string_field(entry, rule.desc.as_deref())
            .map(|s| normalize_text(&s))
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
