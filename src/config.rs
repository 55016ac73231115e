// src/config.rs
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::ingest::types::{FallbackRule, Source};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize)]
struct SourceFile {
    #[serde(default)]
    sources: Vec<SourceEntry>,
}

// Permissive mirror of a `[[sources]]` table; entries with a blank name or
// feed URL are skipped with a warning instead of failing the whole file.
#[derive(Debug, Deserialize)]
struct SourceEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    feed: String,
    #[serde(default)]
    site: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    fallback: Option<FallbackRule>,
}

/// Load the source list from `sources.toml`. An empty result is the caller's
/// run-fatal configuration error to surface.
pub fn load_sources(path: &Path) -> Result<Vec<Source>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let file: SourceFile = toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut sources = Vec::with_capacity(file.sources.len());
    for entry in file.sources {
        let name = entry.name.trim().to_string();
        let feed = entry.feed.trim().to_string();
        if name.is_empty() || feed.is_empty() {
            tracing::warn!(name = %entry.name, "skipping source without name or feed url");
            continue;
        }
        sources.push(Source {
            name,
            feed_url: feed,
            site_url: entry.site,
            timezone: entry.timezone,
            tags: entry.tags,
            fallback: entry.fallback,
        });
    }
    Ok(sources)
}
