// src/summarize/mod.rs
pub mod chat;
pub mod extractive;

use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate};
use thiserror::Error;

use crate::ingest::types::Item;

pub use chat::{ChatSummarizer, ProviderConfig};
pub use extractive::ExtractiveSummarizer;

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("provider is not configured")]
    NotConfigured,
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("provider returned status {0}")]
    Status(u16),
    #[error("provider returned an empty completion")]
    EmptyCompletion,
}

/// One summarization strategy. Strategies are tried in order; any error makes
/// the digester fall through to the next one, so the digest is produced even
/// when every AI provider is unreachable.
#[async_trait]
pub trait Summarize: Send + Sync {
    async fn try_summarize(
        &self,
        date: NaiveDate,
        items: &[Item],
    ) -> Result<String, SummarizeError>;
    /// Strategy name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Environment-derived summarizer configuration. Read once by the
/// collaborator and passed in explicitly, so the core stays testable without
/// process environment mutation. Absence of both providers disables AI
/// summarization without error.
#[derive(Debug, Clone, Default)]
pub struct SummarizeConfig {
    pub zhipu: Option<ProviderConfig>,
    pub openai: Option<ProviderConfig>,
}

impl SummarizeConfig {
    pub fn from_env() -> Self {
        let zhipu = provider_from_env(
            "ZHIPU_API_KEY",
            "ZHIPU_API_BASE",
            "https://open.bigmodel.cn/api/paas/v4",
            "ZHIPU_MODEL",
            "glm-4.7-flash",
        );
        let openai = provider_from_env(
            "OPENAI_API_KEY",
            "OPENAI_API_BASE",
            "https://api.openai.com/v1",
            "OPENAI_MODEL",
            "gpt-4o-mini",
        );
        Self { zhipu, openai }
    }
}

fn provider_from_env(
    key_var: &str,
    base_var: &str,
    default_base: &str,
    model_var: &str,
    default_model: &str,
) -> Option<ProviderConfig> {
    let api_key = std::env::var(key_var).ok().filter(|k| !k.trim().is_empty())?;
    Some(ProviderConfig {
        api_key,
        api_base: std::env::var(base_var).unwrap_or_else(|_| default_base.to_string()),
        model: std::env::var(model_var).unwrap_or_else(|_| default_model.to_string()),
    })
}

/// Build the ordered strategy chain: Zhipu, then OpenAI, then the extractive
/// fallback that always succeeds.
pub fn strategy_chain(config: &SummarizeConfig, offset: FixedOffset) -> Vec<Box<dyn Summarize>> {
    let mut chain: Vec<Box<dyn Summarize>> = Vec::with_capacity(3);
    if let Some(provider) = &config.zhipu {
        chain.push(Box::new(ChatSummarizer::new("zhipu", provider.clone())));
    }
    if let Some(provider) = &config.openai {
        chain.push(Box::new(ChatSummarizer::new("openai", provider.clone())));
    }
    chain.push(Box::new(ExtractiveSummarizer::new(offset)));
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[serial_test::serial]
    #[test]
    fn from_env_without_keys_disables_both_providers() {
        std::env::remove_var("ZHIPU_API_KEY");
        std::env::remove_var("OPENAI_API_KEY");
        let cfg = SummarizeConfig::from_env();
        assert!(cfg.zhipu.is_none());
        assert!(cfg.openai.is_none());

        let chain = strategy_chain(&cfg, FixedOffset::east_opt(0).unwrap());
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].name(), "extractive");
    }

    #[serial_test::serial]
    #[test]
    fn from_env_with_key_uses_defaults_for_base_and_model() {
        std::env::set_var("ZHIPU_API_KEY", "k");
        std::env::remove_var("ZHIPU_API_BASE");
        std::env::remove_var("ZHIPU_MODEL");
        std::env::remove_var("OPENAI_API_KEY");

        let cfg = SummarizeConfig::from_env();
        let zhipu = cfg.zhipu.as_ref().expect("zhipu configured");
        assert_eq!(zhipu.api_base, "https://open.bigmodel.cn/api/paas/v4");
        assert_eq!(zhipu.model, "glm-4.7-flash");

        let chain = strategy_chain(&cfg, FixedOffset::east_opt(0).unwrap());
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].name(), "zhipu");

        std::env::remove_var("ZHIPU_API_KEY");
    }
}
