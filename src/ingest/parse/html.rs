// src/ingest/parse/html.rs
use metrics::{counter, histogram};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::ingest::normalize_text;
use crate::ingest::parse::{absolutize_link, ParseError};
use crate::ingest::timestamp::parse_timestamp_with_default;
use crate::ingest::types::{FallbackRule, Item, Source};

static TIME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("time").expect("static selector"));

fn compile(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|_| ParseError::Selector(selector.to_string()))
}

fn compile_opt(selector: Option<&str>) -> Result<Option<Selector>, ParseError> {
    selector.map(compile).transpose()
}

fn first_match<'a>(node: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    node.select(selector).next()
}

fn element_text(el: ElementRef<'_>) -> String {
    normalize_text(&el.text().collect::<Vec<_>>().join(" "))
}

/// Extract items from an HTML fallback page using the source's configured
/// selector rule. Mirrors what the RSSHub HTML transform would have produced.
pub fn parse(source: &Source, rule: &FallbackRule, body: &str) -> Result<Vec<Item>, ParseError> {
    let t0 = std::time::Instant::now();
    let doc = Html::parse_document(body);

    let item_sel = compile(&rule.item)?;
    let title_sel = compile_opt(rule.title.as_deref())?;
    let link_sel = compile_opt(rule.link.as_deref())?;
    let date_sel = compile_opt(rule.date.as_deref())?;
    let desc_sel = compile_opt(rule.desc.as_deref())?;

    let default_offset = source.utc_offset();
    let mut out = Vec::new();
    for node in doc.select(&item_sel) {
        let title = title_sel
            .as_ref()
            .and_then(|sel| first_match(node, sel))
            .map(element_text)
            .filter(|t| !t.is_empty());
        let Some(title) = title else {
            tracing::debug!(source = %source.name, "dropping html entry without title");
            continue;
        };

        // An entry selector that matches anchors directly doubles as its own
        // link node, so a separate link selector is optional.
        let link_node = link_sel
            .as_ref()
            .and_then(|sel| first_match(node, sel))
            .or_else(|| (node.value().name() == "a").then_some(node));
        let link_attr = rule.link_attr.as_deref().unwrap_or("href");
        let raw_link = link_node.and_then(|n| n.value().attr(link_attr));
        let link = raw_link.and_then(|l| absolutize_link(l, rule.link_prefix.as_deref()));
        let Some(link) = link else {
            tracing::debug!(source = %source.name, title = %title, "dropping html entry without link");
            continue;
        };

        let date_node = date_sel
            .as_ref()
            .and_then(|sel| first_match(node, sel))
            .or_else(|| first_match(node, &TIME_SELECTOR));
        let raw_date = date_node.and_then(|n| {
            rule.date_attr
                .as_deref()
                .and_then(|attr| n.value().attr(attr))
                .or_else(|| n.value().attr("datetime"))
                .map(str::to_string)
                .or_else(|| Some(element_text(n)).filter(|t| !t.is_empty()))
        });
        let published_at = match raw_date
            .as_deref()
            .map(|d| parse_timestamp_with_default(d, default_offset))
        {
            Some(Ok(dt)) => dt,
            _ => {
                tracing::debug!(
                    source = %source.name,
                    title = %title,
                    "dropping html entry without usable publish date"
                );
                continue;
            }
        };

        let summary = desc_sel
            .as_ref()
            .and_then(|sel| first_match(node, sel))
            .and_then(|n| {
                rule.desc_attr
                    .as_deref()
                    .and_then(|attr| n.value().attr(attr))
                    .map(|v| normalize_text(v))
                    .or_else(|| Some(element_text(n)))
            })
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
