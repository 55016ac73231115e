// src/summarize/chat.rs
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Summarize, SummarizeError};
use crate::ingest::types::Item;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(4);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const SYSTEM_PROMPT: &str = "You are an assistant that writes concise daily vendor digests. \
Return markdown with two top-level sections: '## English' and '## 中文'. \
Within each section, group by vendor using '### Vendor'. \
Each item should be a single bullet with 1-2 sentences, always include the source link.";

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
}

/// OpenAI-compatible chat-completion summarizer. The two supported providers
/// speak the same request/response shape and differ only in base URL, auth
/// key, and default model.
pub struct ChatSummarizer {
    name: &'static str,
    http: reqwest::Client,
    config: ProviderConfig,
}

impl ChatSummarizer {
    pub fn new(name: &'static str, config: ProviderConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("llm-vendor-daily/0.1")
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client");
        Self { name, http, config }
    }

    fn prompt(date: NaiveDate, items: &[Item]) -> String {
        let bullets: Vec<String> = items
            .iter()
            .map(|item| {
                format!(
                    "[{}] {} | {} | {}",
                    item.source,
                    item.title,
                    item.link,
                    item.summary.as_deref().unwrap_or_default()
                )
            })
            .collect();
        format!(
            "Write a bilingual daily digest for {date}.\nItems:\n{}",
            bullets.join("\n")
        )
    }
}

#[async_trait]
impl Summarize for ChatSummarizer {
    async fn try_summarize(
        &self,
        date: NaiveDate,
        items: &[Item],
    ) -> Result<String, SummarizeError> {
        if self.config.api_key.is_empty() {
            return Err(SummarizeError::NotConfigured);
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let user = Self::prompt(date, items);
        let req = Req {
            model: &self.config.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.2,
        };

        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&req)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SummarizeError::Status(status.as_u16()));
        }

        let body: Resp = resp.json().await?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.trim())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(SummarizeError::EmptyCompletion);
        }
        Ok(format!("{content}\n"))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn prompt_lists_one_bullet_per_item() {
        let items = vec![
            Item {
                source: "Vendor".into(),
                title: "Launch".into(),
                link: "https://vendor.test/launch".into(),
                published_at: Utc.with_ymd_and_hms(2025, 3, 4, 8, 0, 0).unwrap(),
                summary: Some("It shipped.".into()),
                tags: Vec::new(),
            },
            Item {
                source: "Other".into(),
                title: "Update".into(),
                link: "https://other.test/update".into(),
                published_at: Utc.with_ymd_and_hms(2025, 3, 4, 9, 0, 0).unwrap(),
                summary: None,
                tags: Vec::new(),
            },
        ];
        let prompt =
            ChatSummarizer::prompt(NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(), &items);
        assert!(prompt.starts_with("Write a bilingual daily digest for 2025-03-04."));
        assert!(prompt.contains("[Vendor] Launch | https://vendor.test/launch | It shipped."));
        assert!(prompt.contains("[Other] Update | https://other.test/update | "));
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let summarizer = ChatSummarizer::new(
            "openai",
            ProviderConfig {
                api_key: String::new(),
                api_base: "https://api.openai.com/v1".into(),
                model: "gpt-4o-mini".into(),
            },
        );
        let err = summarizer
            .try_summarize(NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizeError::NotConfigured));
    }
}
