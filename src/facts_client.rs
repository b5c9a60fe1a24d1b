//! Aircraft-fact generation through an OpenAI-compatible chat endpoint.
//!
//! Entirely optional: without an API key configured every lookup resolves to
//! `None`, and the enrichment cache makes sure that answer sticks per key.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::FactsConfig;
use crate::enricher::FactsLookup;

pub struct FactsClient {
    client: Client,
    config: Option<FactsConfig>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl FactsClient {
    pub fn new(client: Client, config: Option<FactsConfig>) -> Self {
        Self { client, config }
    }

    fn prompt(
        type_code: Option<&str>,
        category: Option<&str>,
        registration: Option<&str>,
    ) -> String {
        let mut subject = String::new();
        if let Some(reg) = registration {
            subject.push_str(&format!("the aircraft registered {} ", reg));
        }
        if let Some(code) = type_code {
            subject.push_str(&format!("of type {} ", code));
        }
        if let Some(cat) = category {
            subject.push_str(&format!("({}) ", cat));
        }
        if subject.is_empty() {
            subject.push_str("this aircraft ");
        }
        format!(
            "Give one short, interesting fact about {}in at most two sentences. \
             Plain text, no preamble.",
            subject
        )
    }
}

#[async_trait]
impl FactsLookup for FactsClient {
    async fn lookup_facts(
        &self,
        type_code: Option<&str>,
        category: Option<&str>,
        registration: Option<&str>,
    ) -> Result<Option<String>> {
        let Some(config) = &self.config else {
            return Ok(None);
        };

        let body = json!({
            "model": config.model,
            "messages": [ChatMessage {
                role: "user",
                content: Self::prompt(type_code, category, registration),
            }],
            "max_tokens": 120,
        });

        let response = self
            .client
            .post(format!(
                "{}/v1/chat/completions",
                config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&config.api_key)
            .json(&body)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .context("Failed to query facts endpoint")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Facts endpoint error {}", status));
        }

        let payload: ChatResponse = response
            .json()
            .await
            .context("Failed to parse facts response")?;
        Ok(payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_client_returns_none_without_io() {
        let client = FactsClient::new(Client::new(), None);
        let facts = client
            .lookup_facts(Some("B738"), Some("commercial"), Some("PH-BXA"))
            .await
            .unwrap();
        assert_eq!(facts, None);
    }

    #[test]
    fn prompt_mentions_what_is_known() {
        let p = FactsClient::prompt(Some("B738"), Some("commercial"), Some("PH-BXA"));
        assert!(p.contains("PH-BXA"));
        assert!(p.contains("B738"));

        let fallback = FactsClient::prompt(None, None, None);
        assert!(fallback.contains("this aircraft"));
    }

    #[test]
    fn chat_response_parses() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": " A fact. "}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        let text = parsed.choices.into_iter().next().unwrap().message.content;
        assert_eq!(text.as_deref(), Some(" A fact. "));
    }
}
