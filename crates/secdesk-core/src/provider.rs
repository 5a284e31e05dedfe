//! Chat-completion provider
//!
//! The dispatcher talks to the model through the `ChatProvider` trait so
//! tests can substitute a stub. The only real implementation is an
//! OpenAI-style chat-completions client: one request per query, a single
//! system + user message pair, no streaming, no retries.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// A single-turn chat completion backend
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Human-readable provider name (e.g. "openai")
    fn provider_name(&self) -> &str;

    /// Model identifier (e.g. "gpt-3.5-turbo")
    fn model(&self) -> &str;

    /// Send one system + user message pair and return the generated text
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// OpenAI chat-completions provider
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String, base_url: String, max_tokens: u32) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url,
            model,
            max_tokens,
        }
    }

    fn request_body(&self, system: &str, user: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![
                WireMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                WireMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
        }
    }

    /// Extract the trimmed text of the first choice
    fn first_choice_text(resp: ChatCompletionResponse) -> Result<String> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Chat completion response had no choices"))?;

        let content = choice
            .message
            .content
            .ok_or_else(|| anyhow!("Chat completion choice had no text content"))?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.request_body(system, user);

        debug!("Chat request: model={}, user chars={}", self.model, user.len());

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to send chat completion request")?;

        let status = response.status();
        if !status.is_success() {
            // The response body carries the upstream error code (e.g.
            // "insufficient_quota"), which the dispatcher matches on
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "Chat completion request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        debug!("Chat response: choices={}", api_response.choices.len());

        Self::first_choice_text(api_response)
    }
}

// ── Chat completions wire types ──

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<WireMessage>,
}

#[derive(Debug, Clone, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct WireChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new(
            "sk-secret-key".to_string(),
            "gpt-3.5-turbo".to_string(),
            "https://api.openai.com".to_string(),
            1024,
        )
    }

    #[test]
    fn test_request_body_shape() {
        let body = provider().request_body("You are a Cybersecurity expert assistant.", "hi");
        assert_eq!(body.model, "gpt-3.5-turbo");
        assert_eq!(body.max_tokens, 1024);
        assert_eq!(body.messages.len(), 2);
        assert_eq!(body.messages[0].role, "system");
        assert_eq!(
            body.messages[0].content,
            "You are a Cybersecurity expert assistant."
        );
        assert_eq!(body.messages[1].role, "user");
        assert_eq!(body.messages[1].content, "hi");
    }

    #[test]
    fn test_first_choice_text_trims() {
        let resp = ChatCompletionResponse {
            choices: vec![WireChoice {
                message: WireChoiceMessage {
                    content: Some("  An answer.\n".to_string()),
                },
            }],
        };
        assert_eq!(OpenAiProvider::first_choice_text(resp).unwrap(), "An answer.");
    }

    #[test]
    fn test_first_choice_text_no_choices() {
        let resp = ChatCompletionResponse { choices: vec![] };
        assert!(OpenAiProvider::first_choice_text(resp).is_err());
    }

    #[test]
    fn test_first_choice_text_no_content() {
        let resp = ChatCompletionResponse {
            choices: vec![WireChoice {
                message: WireChoiceMessage { content: None },
            }],
        };
        assert!(OpenAiProvider::first_choice_text(resp).is_err());
    }

    #[test]
    fn test_response_deserializes_from_wire_json() {
        let json = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "Hello!"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2}
        }"#;
        let resp: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(OpenAiProvider::first_choice_text(resp).unwrap(), "Hello!");
    }

    #[test]
    fn test_debug_hides_key() {
        let debug = format!("{:?}", provider());
        assert!(!debug.contains("sk-secret-key"));
    }
}
