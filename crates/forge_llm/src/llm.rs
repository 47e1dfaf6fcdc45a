//! LLM adapter for text completions.
//!
//! Supports Gemini, OpenAI and Anthropic APIs, selected explicitly or via
//! environment variables.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GenerationError, GenerationResult};

/// A single-prompt completion backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Model identifier, for logs.
    fn model(&self) -> String;

    /// Send one prompt and return the raw response text.
    async fn complete(&self, prompt: &str) -> GenerationResult<String>;
}

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Gemini,
    OpenAI,
    Anthropic,
}

impl LlmProvider {
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.5-flash",
            Self::OpenAI => "gpt-5-mini",
            Self::Anthropic => "claude-sonnet-4-5",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            "openai" => Some(Self::OpenAI),
            "anthropic" | "claude" => Some(Self::Anthropic),
            _ => None,
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "Gemini"),
            Self::OpenAI => write!(f, "OpenAI"),
            Self::Anthropic => write!(f, "Anthropic"),
        }
    }
}

/// Adapter settings as read from a config file.
///
/// Unset fields fall back to the environment: with no provider the first
/// provider whose key variable is set wins, with no key the provider's own
/// variable is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: Option<LlmProvider>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_retries: u32,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: None,
            api_key: None,
            model: None,
            max_retries: 0,
            temperature: 0.7,
            max_output_tokens: 32768,
        }
    }
}

impl LlmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(mut self, provider: LlmProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Build the adapter, failing with `NotConfigured` when no key is found.
    pub fn build(&self) -> GenerationResult<LlmAdapter> {
        let model = self.model.clone().filter(|m| !m.is_empty());
        let adapter = match self.provider {
            Some(provider) => {
                let key = self
                    .api_key
                    .clone()
                    .or_else(|| std::env::var(provider.api_key_var()).ok())
                    .filter(|k| !k.is_empty())
                    .ok_or(GenerationError::NotConfigured)?;
                LlmAdapter::new(provider, key, model)
            }
            None => {
                let mut adapter = LlmAdapter::from_env()?;
                if let Some(model) = model {
                    adapter.model = model;
                }
                adapter
            }
        };

        Ok(adapter
            .with_retries(self.max_retries)
            .with_temperature(self.temperature)
            .with_max_output_tokens(self.max_output_tokens))
    }
}

/// LLM adapter that handles API calls
pub struct LlmAdapter {
    provider: LlmProvider,
    api_key: String,
    model: String,
    client: reqwest::Client,
    max_retries: u32,
    temperature: f32,
    max_output_tokens: u32,
}

impl LlmAdapter {
    /// Create a new LLM adapter with explicit configuration
    pub fn new(provider: LlmProvider, api_key: impl Into<String>, model: Option<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| provider.default_model().to_string()),
            client: reqwest::Client::new(),
            max_retries: 0,
            temperature: 0.7,
            max_output_tokens: 32768,
        }
    }

    /// Create an LLM adapter from environment variables
    ///
    /// Checks in order:
    /// 1. GEMINI_API_KEY
    /// 2. OPENAI_API_KEY
    /// 3. ANTHROPIC_API_KEY
    pub fn from_env() -> GenerationResult<Self> {
        let custom_model = std::env::var("FORGE_LLM_MODEL").ok().filter(|m| !m.is_empty());

        for (provider, var) in [
            (LlmProvider::Gemini, "GEMINI_API_KEY"),
            (LlmProvider::OpenAI, "OPENAI_API_KEY"),
            (LlmProvider::Anthropic, "ANTHROPIC_API_KEY"),
        ] {
            if let Ok(api_key) = std::env::var(var) {
                if !api_key.is_empty() {
                    return Ok(Self::new(provider, api_key, custom_model));
                }
            }
        }

        Err(GenerationError::NotConfigured)
    }

    /// Retry transient failures (network, 5xx, 429) up to `retries` extra
    /// times with exponential backoff. Off by default.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = tokens;
        self
    }

    /// Get the current provider
    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    fn request(&self, prompt: &str) -> reqwest::RequestBuilder {
        match self.provider {
            LlmProvider::Gemini => {
                let url = format!(
                    "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
                    self.model
                );
                self.client
                    .post(url)
                    .header("x-goog-api-key", &self.api_key)
                    .json(&GeminiRequest {
                        contents: vec![GeminiContent {
                            parts: vec![GeminiPart {
                                text: prompt.to_string(),
                            }],
                        }],
                        generation_config: GeminiGenerationConfig {
                            temperature: self.temperature,
                            top_p: 0.95,
                            top_k: 40,
                            max_output_tokens: self.max_output_tokens,
                        },
                    })
            }
            LlmProvider::OpenAI => self
                .client
                .post("https://api.openai.com/v1/chat/completions")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&OpenAIRequest {
                    model: self.model.clone(),
                    messages: vec![OpenAIMessage {
                        role: "user".to_string(),
                        content: prompt.to_string(),
                    }],
                    max_completion_tokens: Some(self.max_output_tokens),
                }),
            LlmProvider::Anthropic => self
                .client
                .post("https://api.anthropic.com/v1/messages")
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .json(&AnthropicRequest {
                    model: self.model.clone(),
                    max_tokens: self.max_output_tokens.min(8192),
                    messages: vec![AnthropicMessage {
                        role: "user".to_string(),
                        content: prompt.to_string(),
                    }],
                }),
        }
    }

    async fn send(&self, prompt: &str) -> GenerationResult<String> {
        let attempts = self.max_retries + 1;
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let response = match self.request(prompt).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!("{} network error (attempt {}/{}): {}", self.provider, attempt + 1, attempts, e);
                    last_error = Some(GenerationError::Transport(format!("Network error: {}", e)));
                    continue;
                }
            };

            let status = response.status();

            if status.is_server_error() || status.as_u16() == 429 {
                let body = response.text().await.unwrap_or_default();
                last_error = Some(GenerationError::Transport(format!(
                    "{} API error {} (attempt {}/{}): {}",
                    self.provider,
                    status,
                    attempt + 1,
                    attempts,
                    body
                )));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(GenerationError::Transport(format!(
                    "{} API error {}: {}",
                    self.provider, status, body
                )));
            }

            let body = response.text().await?;
            return self.parse(&body);
        }

        Err(last_error.unwrap_or_else(|| GenerationError::Transport("Max retries exceeded".to_string())))
    }

    fn parse(&self, body: &str) -> GenerationResult<String> {
        let parse_err =
            |e: serde_json::Error| GenerationError::Transport(format!("Failed to parse response: {}", e));

        let text = match self.provider {
            LlmProvider::Gemini => {
                let result: GeminiResponse = serde_json::from_str(body).map_err(parse_err)?;
                result
                    .candidates
                    .into_iter()
                    .next()
                    .and_then(|c| c.content)
                    .map(|content| {
                        content
                            .parts
                            .into_iter()
                            .filter_map(|p| p.text)
                            .collect::<Vec<_>>()
                            .join("")
                    })
            }
            LlmProvider::OpenAI => {
                let result: OpenAIResponse = serde_json::from_str(body).map_err(parse_err)?;
                result.choices.into_iter().next().and_then(|c| c.message.content)
            }
            LlmProvider::Anthropic => {
                let result: AnthropicResponse = serde_json::from_str(body).map_err(parse_err)?;
                result.content.into_iter().find_map(|c| c.text)
            }
        };

        match text {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(GenerationError::EmptyResponse(self.provider.to_string())),
        }
    }
}

#[async_trait]
impl CompletionClient for LlmAdapter {
    fn model(&self) -> String {
        self.model.clone()
    }

    async fn complete(&self, prompt: &str) -> GenerationResult<String> {
        debug!("Sending {} byte prompt to {} ({})", prompt.len(), self.provider, self.model);
        self.send(prompt).await
    }
}

// Gemini API types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

// Anthropic API types
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_with_explicit_key() {
        let adapter = LlmConfig::new()
            .provider(LlmProvider::Anthropic)
            .api_key("sk-test")
            .model("claude-haiku-4-5")
            .max_retries(2)
            .build()
            .unwrap();
        assert_eq!(adapter.provider(), LlmProvider::Anthropic);
        assert_eq!(CompletionClient::model(&adapter), "claude-haiku-4-5");
        assert_eq!(adapter.max_retries, 2);
    }

    #[test]
    fn test_config_provider_from_toml() {
        let config: LlmConfig = toml::from_str("provider = \"openai\"\napi_key = \"k\"\n").unwrap();
        assert_eq!(config.provider, Some(LlmProvider::OpenAI));
        assert_eq!(config.temperature, 0.7);
    }

    #[test]
    fn test_default_models() {
        let adapter = LlmAdapter::new(LlmProvider::Gemini, "key", None);
        assert_eq!(CompletionClient::model(&adapter), "gemini-2.5-flash");

        let adapter = LlmAdapter::new(LlmProvider::OpenAI, "key", Some("gpt-4o".into()));
        assert_eq!(CompletionClient::model(&adapter), "gpt-4o");
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(LlmProvider::parse("Gemini"), Some(LlmProvider::Gemini));
        assert_eq!(LlmProvider::parse("claude"), Some(LlmProvider::Anthropic));
        assert_eq!(LlmProvider::parse("mock"), None);
    }

    #[test]
    fn test_parse_gemini_response() {
        let adapter = LlmAdapter::new(LlmProvider::Gemini, "key", None);
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"```rust\n"},{"text":"fn a() {}\n```"}]}}]}"#;
        assert_eq!(adapter.parse(body).unwrap(), "```rust\nfn a() {}\n```");
    }

    #[test]
    fn test_parse_empty_response() {
        let adapter = LlmAdapter::new(LlmProvider::Anthropic, "key", None);
        let err = adapter.parse(r#"{"content":[]}"#).unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse(_)));

        let adapter = LlmAdapter::new(LlmProvider::OpenAI, "key", None);
        assert!(adapter.parse("not json").is_err());
    }

    #[test]
    fn test_gemini_request_shape() {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: "hi".into() }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: 0.5,
                top_p: 0.95,
                top_k: 40,
                max_output_tokens: 1024,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1024);
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
    }
}
