// src/ingest/fetch.rs
use std::time::Duration;

use thiserror::Error;

use crate::ingest::parse::detect_format;
use crate::ingest::types::{FallbackKind, FallbackRule, FeedFormat, RawFeedDocument, Source};

const USER_AGENT: &str = "llm-vendor-daily/0.1";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("http status {0}")]
    Status(u16),
    #[error("expected a feed but got {0}")]
    BlockPage(&'static str),
}

pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client");
        Self { client }
    }

    /// Retrieve raw feed content for one source: the primary feed URL first,
    /// then at most one fallback attempt. The fallback is either the source's
    /// configured rule or one derived from an RSSHub transform URL; a source
    /// with neither is fetch-only.
    pub async fn fetch(&self, source: &Source) -> Result<RawFeedDocument, FetchError> {
        let err = match self.fetch_primary(source).await {
            Ok(doc) => return Ok(doc),
            Err(err) => err,
        };
        let Some(rule) = resolve_fallback(source) else {
            return Err(err);
        };
        tracing::warn!(
            source = %source.name,
            error = %err,
            fallback = %rule.url,
            "primary fetch failed, trying fallback"
        );
        self.fetch_fallback(source, rule).await
    }

    async fn fetch_primary(&self, source: &Source) -> Result<RawFeedDocument, FetchError> {
        let resp = self.client.get(&source.feed_url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = resp.bytes().await?.to_vec();
        // A 200 carrying an HTML page where a feed was expected is a block
        // page; treat it like a failed attempt so the fallback can run.
        match detect_format(&body) {
            Some(format @ (FeedFormat::Rss | FeedFormat::Atom)) => Ok(RawFeedDocument {
                source: source.name.clone(),
                format,
                body,
                rule: None,
            }),
            Some(FeedFormat::Html) => Err(FetchError::BlockPage("an html page")),
            Some(FeedFormat::Json) => Err(FetchError::BlockPage("a json document")),
            None => Err(FetchError::BlockPage("unrecognized content")),
        }
    }

    async fn fetch_fallback(
        &self,
        source: &Source,
        rule: FallbackRule,
    ) -> Result<RawFeedDocument, FetchError> {
        let resp = self.client.get(&rule.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = resp.bytes().await?.to_vec();
        let format = match rule.kind {
            FallbackKind::Html => FeedFormat::Html,
            FallbackKind::Json => FeedFormat::Json,
        };
        Ok(RawFeedDocument {
            source: source.name.clone(),
            format,
            body,
            rule: Some(rule),
        })
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_fallback(source: &Source) -> Option<FallbackRule> {
    source
        .fallback
        .clone()
        .or_else(|| FallbackRule::from_rsshub_url(&source.feed_url))
}
