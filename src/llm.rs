//! Language-model client for OpenAI-compatible chat completion APIs.
//!
//! The advisor talks to the model through [`LanguageModel`] so tests can swap
//! in a scripted fake. [`OpenAiClient`] performs exactly one HTTP request per
//! call; failures are returned, never retried.

use crate::error::{AdvisorError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini-2025-04-14";

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Wait hint used when a 429 carries no usable `Retry-After`
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// LLM configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of the message sequence sent to the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// The model collaborator: turn a message sequence into text
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion with at most `max_tokens` output tokens
    async fn complete(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String>;
}

/// Token usage tracking
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Accumulated token usage with atomic counters
struct AtomicTokenUsage {
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
    total_tokens: AtomicU64,
}

impl AtomicTokenUsage {
    fn new() -> Self {
        Self {
            prompt_tokens: AtomicU64::new(0),
            completion_tokens: AtomicU64::new(0),
            total_tokens: AtomicU64::new(0),
        }
    }

    fn add(&self, usage: &TokenUsage) {
        self.prompt_tokens.fetch_add(usage.prompt_tokens, Ordering::Relaxed);
        self.completion_tokens.fetch_add(usage.completion_tokens, Ordering::Relaxed);
        self.total_tokens.fetch_add(usage.total_tokens, Ordering::Relaxed);
    }

    fn get(&self) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
            total_tokens: self.total_tokens.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

/// OpenAI-compatible API response structures
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

/// Chat completion client for any OpenAI-compatible endpoint
pub struct OpenAiClient {
    client: reqwest::Client,
    endpoint: Url,
    config: LlmConfig,
    usage: AtomicTokenUsage,
}

impl OpenAiClient {
    /// Create a client; fails on an empty API key or an invalid base URL
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AdvisorError::Config("LLM API key is not set".to_string()));
        }

        let endpoint = completions_url(&config.base_url)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AdvisorError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            config,
            usage: AtomicTokenUsage::new(),
        })
    }

    /// Total token usage since the client was created
    pub fn usage(&self) -> TokenUsage {
        self.usage.get()
    }

    /// Add one call's usage, returning the new session total
    fn record_usage(&self, usage: &TokenUsage) -> TokenUsage {
        self.usage.add(usage);
        self.usage.get()
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let request_body = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature,
            max_tokens,
        };

        debug!(
            model = %self.config.model,
            messages = messages.len(),
            max_tokens,
            "Sending LLM request"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let wait = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(AdvisorError::RateLimited(wait));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AdvisorError::Api {
                code: i32::from(status.as_u16()),
                message: format!("LLM API error: {} - {}", status, error_text),
            });
        }

        let body = response.text().await?;
        let (content, usage) = parse_completion(&body)?;
        let total = self.record_usage(&usage);
        info!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            session_total_tokens = total.total_tokens,
            "LLM request complete"
        );

        Ok(content)
    }
}

/// Join the base URL with the chat completions path
fn completions_url(base_url: &str) -> Result<Url> {
    Url::parse(&format!("{}/chat/completions", base_url.trim_end_matches('/')))
        .map_err(|e| AdvisorError::Config(format!("Invalid LLM base URL '{}': {}", base_url, e)))
}

/// Extract the first choice's text and the reported usage
fn parse_completion(body: &str) -> Result<(String, TokenUsage)> {
    let api_response: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| AdvisorError::Parse(format!("Failed to parse LLM response: {}", e)))?;

    let usage = api_response
        .usage
        .map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    let content = api_response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| AdvisorError::Parse("LLM response has no message content".to_string()))?;

    Ok((content, usage))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion() -> Result<()> {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "  Привет  "}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150}
        }"#;
        let (content, usage) = parse_completion(body)?;
        assert_eq!(content, "  Привет  ");
        assert_eq!(usage.total_tokens, 150);
        Ok(())
    }

    #[test]
    fn test_parse_completion_without_choices() {
        let result = parse_completion(r#"{"choices": []}"#);
        assert!(matches!(result, Err(AdvisorError::Parse(_))));
    }

    #[test]
    fn test_parse_completion_malformed() {
        assert!(matches!(
            parse_completion("<html>502</html>"),
            Err(AdvisorError::Parse(_))
        ));
    }

    #[test]
    fn test_completions_url() -> Result<()> {
        let url = completions_url("https://api.openai.com/v1/")?;
        assert_eq!(url.as_str(), "https://api.openai.com/v1/chat/completions");
        assert!(completions_url("not a url").is_err());
        Ok(())
    }

    #[test]
    fn test_client_requires_api_key() {
        let result = OpenAiClient::new(LlmConfig::default());
        assert!(matches!(result, Err(AdvisorError::Config(_))));
    }

    #[test]
    fn test_client_usage_totals() -> Result<()> {
        let client = OpenAiClient::new(LlmConfig {
            api_key: "sk-test".to_string(),
            ..Default::default()
        })?;
        assert_eq!(client.usage(), TokenUsage::default());

        let call = TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 20,
            total_tokens: 120,
        };
        client.record_usage(&call);
        let total = client.record_usage(&call);
        assert_eq!(total.total_tokens, 240);
        assert_eq!(client.usage(), total);
        Ok(())
    }

    #[test]
    fn test_message_serialization() -> Result<()> {
        let json = serde_json::to_value(ChatMessage::system("rules"))?;
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "rules");
        Ok(())
    }

    #[test]
    fn test_usage_accumulates() {
        let usage = AtomicTokenUsage::new();
        let step = TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        };
        usage.add(&step);
        usage.add(&step);
        assert_eq!(usage.get().total_tokens, 30);
    }
}
