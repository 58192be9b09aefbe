//! LLM client abstraction layer.
//!
//! This module provides:
//! - [`LlmClient`] trait for swappable LLM providers
//! - [`ModelResponse`], the three outcomes of one provider call
//! - [`ProviderRegistry`] for dynamic provider creation
//!
//! # Adding a New Provider
//!
//! 1. Create a new file (e.g., `openai.rs`)
//! 2. Implement `LlmClient` trait, mapping throttling to `Error::QuotaExceeded`
//! 3. Add to `ProviderRegistry::create()`
//! 4. Add config fields in `config.rs`

mod types;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::Error;
use crate::tools::ToolDefinition;
use crate::Result;

pub use types::*;

pub mod gemini;

pub use gemini::GeminiClient;

use super::message::{Message, ToolCallRequest};

/// What one provider call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    /// Final natural-language answer.
    Text(String),

    /// The model wants tools run; `text` is any prose emitted alongside.
    FunctionCalls {
        text: Option<String>,
        calls: Vec<ToolCallRequest>,
    },

    /// The provider withheld every candidate.
    SafetyFiltered,
}

impl ModelResponse {
    /// Shorthand for a single-call response in tests and fakes.
    pub fn call(name: &str, args: serde_json::Value) -> Self {
        ModelResponse::FunctionCalls {
            text: None,
            calls: vec![ToolCallRequest::new("tc_0", name, args)],
        }
    }
}

/// Sampling parameters for one provider call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl GenerationParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_output_tokens: 8192,
        }
    }
}

/// LLM client trait — swappable provider abstraction.
///
/// Implementations classify throttling as `Error::QuotaExceeded`; every
/// other error is treated as fatal by the gateway.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send messages and get response.
    async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        params: &GenerationParams,
    ) -> Result<ModelResponse>;

    /// Get the default model for this provider.
    fn default_model(&self) -> &str;
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Box<T> {
    async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        params: &GenerationParams,
    ) -> Result<ModelResponse> {
        (**self).generate(messages, tools, params).await
    }

    fn default_model(&self) -> &str {
        (**self).default_model()
    }
}

/// Provider registry — creates LLM clients dynamically.
///
/// # Example
///
/// ```ignore
/// let client = ProviderRegistry::create(&config)?;
/// let response = client.generate(&messages, &tools, &params).await?;
/// ```
pub struct ProviderRegistry;

impl ProviderRegistry {
    /// Create an LLM client from configuration.
    ///
    /// Supported providers:
    /// - `"gemini"`: Gemini API with API key authentication
    pub fn create(config: &Config) -> Result<Box<dyn LlmClient>> {
        match config.provider.as_str() {
            "gemini" => {
                if config.gemini_api_key.trim().is_empty() {
                    return Err(Error::Config(
                        "No Gemini API key. Run `fieldhand onboard` or set GEMINI_API_KEY".to_string(),
                    ));
                }
                Ok(Box::new(GeminiClient::new(&config.gemini_api_key, &config.model)))
            }
            other => Err(Error::Config(format!(
                "Unknown provider: {other} (available: {})",
                Self::available().join(", ")
            ))),
        }
    }

    /// List available provider names.
    pub fn available() -> &'static [&'static str] {
        &["gemini"]
    }
}

/// Scripted LLM client for testing.
///
/// Replies are popped in order; once the script runs out the `repeat`
/// response (if any) is returned forever. Every request is recorded.
#[cfg(test)]
pub struct FakeLlmClient {
    script: std::sync::Mutex<std::collections::VecDeque<Result<ModelResponse>>>,
    repeat: Option<ModelResponse>,
    requests: std::sync::Mutex<Vec<Vec<Message>>>,
}

#[cfg(test)]
impl FakeLlmClient {
    /// Create with predefined text responses.
    pub fn new(responses: Vec<&str>) -> Self {
        Self::scripted(
            responses
                .iter()
                .map(|s| Ok(ModelResponse::Text(s.to_string())))
                .collect(),
        )
    }

    /// Create with arbitrary replies, including errors.
    pub fn scripted(script: Vec<Result<ModelResponse>>) -> Self {
        Self {
            script: std::sync::Mutex::new(script.into()),
            repeat: None,
            requests: std::sync::Mutex::new(vec![]),
        }
    }

    /// A model that answers every call with the same response.
    pub fn always(response: ModelResponse) -> Self {
        Self {
            repeat: Some(response),
            ..Self::scripted(vec![])
        }
    }

    /// Number of provider calls made so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The messages sent on each call.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn generate(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
        _params: &GenerationParams,
    ) -> Result<ModelResponse> {
        self.requests.lock().unwrap().push(messages.to_vec());

        let next = self.script.lock().unwrap().pop_front();
        match (next, &self.repeat) {
            (Some(reply), _) => reply,
            (None, Some(repeat)) => Ok(repeat.clone()),
            (None, None) => Err(Error::Llm("No more fake responses".to_string())),
        }
    }

    fn default_model(&self) -> &str {
        "fake-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_llm_client() {
        let client = FakeLlmClient::new(vec!["Hello!", "World!"]);
        let params = GenerationParams::default();

        let resp1 = client.generate(&[], &[], &params).await.unwrap();
        assert_eq!(resp1, ModelResponse::Text("Hello!".into()));

        let resp2 = client.generate(&[], &[], &params).await.unwrap();
        assert_eq!(resp2, ModelResponse::Text("World!".into()));

        assert!(client.generate(&[], &[], &params).await.is_err());
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn test_fake_llm_client_repeats() {
        let client = FakeLlmClient::always(ModelResponse::call("search_catalog", serde_json::json!({})));
        let params = GenerationParams::default();
        for _ in 0..10 {
            assert!(matches!(
                client.generate(&[], &[], &params).await.unwrap(),
                ModelResponse::FunctionCalls { .. }
            ));
        }
    }

    #[test]
    fn test_registry_requires_api_key() {
        let config = Config::default();
        assert!(matches!(ProviderRegistry::create(&config), Err(Error::Config(_))));

        let config = Config {
            gemini_api_key: "key".into(),
            ..Config::default()
        };
        let client = ProviderRegistry::create(&config).unwrap();
        assert_eq!(client.default_model(), config.model);
    }

    #[test]
    fn test_unknown_provider_lists_available() {
        let config = Config {
            provider: "openai".into(),
            gemini_api_key: "key".into(),
            ..Config::default()
        };
        let Err(Error::Config(msg)) = ProviderRegistry::create(&config) else {
            panic!("unknown provider should be a config error");
        };
        assert_eq!(msg, "Unknown provider: openai (available: gemini)");
        assert!(ProviderRegistry::available().contains(&Config::default().provider.as_str()));
    }
}
