//! OpenAI provider implementation
//!
//! This module implements the LLMProvider trait for OpenAI's chat completions
//! API and the many servers that mimic it.
//! See: https://platform.openai.com/docs/api-reference/chat
//!
//! ## Using with OpenAI-compatible APIs
//!
//! ```no_run
//! use advisor_llm::providers::{OpenAIConfig, OpenAIProvider};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Local deployments (llama.cpp, vLLM, LM Studio)
//! let local_config = OpenAIConfig::new("not-needed")
//!     .with_api_base("http://localhost:8000/v1");
//!
//! let provider = OpenAIProvider::with_config(local_config)?;
//! # Ok(())
//! # }
//! ```

use super::check_status;
use crate::{
    CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, Result, Role,
    StopReason, TokenUsage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for OpenAI provider
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base URL for the OpenAI API (default: "https://api.openai.com/v1")
    /// Can be customized for OpenAI-compatible APIs like Azure OpenAI, local deployments, etc.
    pub api_base: String,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl OpenAIConfig {
    /// Create a new config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Create config from environment variable
    ///
    /// Reads the API key from `OPENAI_API_KEY` environment variable.
    /// Optionally reads base URL from `OPENAI_API_BASE` if set.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            LLMError::ConfigurationError("OPENAI_API_KEY environment variable not set".to_string())
        })?;

        let config = Self::new(api_key);
        Ok(match std::env::var("OPENAI_API_BASE") {
            Ok(base) => config.with_api_base(base),
            Err(_) => config,
        })
    }

    /// Set custom API base URL
    ///
    /// Useful for:
    /// - Azure OpenAI: "https://YOUR_RESOURCE.openai.azure.com/openai/deployments/YOUR_DEPLOYMENT"
    /// - Local deployments: "http://localhost:8000/v1"
    /// - Gemini's compatibility layer: "https://generativelanguage.googleapis.com/v1beta/openai"
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}

/// OpenAI provider
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with custom configuration
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a new OpenAI provider with API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(OpenAIConfig::new(api_key))
    }

    /// Create a provider from environment variables
    pub fn from_env() -> Result<Self> {
        Self::with_config(OpenAIConfig::from_env()?)
    }

    /// Get the current configuration
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    #[instrument(skip(self, request), fields(model = %request.model, api_base = %self.config.api_base))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!("Sending request to OpenAI API at {}", self.config.api_base);

        let model = request.model.clone();
        let openai_request = OpenAIRequest {
            model: request.model,
            messages: build_openai_messages(request.system, request.messages),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stop: request.stop_sequences,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&openai_request)
            .send()
            .await?;

        let response = check_status(response, &model).await?;

        let openai_response: OpenAIResponse = response.json().await.map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        // OpenAI can return multiple choices; we only ever ask for one
        let choice = openai_response.choices.into_iter().next().ok_or_else(|| {
            LLMError::UnexpectedResponse("No choices in response".to_string())
        })?;

        let usage = openai_response
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        let finish_reason = choice.finish_reason.unwrap_or_default();
        debug!(
            "Received response - stop_reason: {}, tokens: {}/{}",
            finish_reason, usage.input_tokens, usage.output_tokens
        );

        Ok(CompletionResponse {
            message: Message::assistant(choice.message.content.unwrap_or_default()),
            stop_reason: map_stop_reason(&finish_reason),
            usage,
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ============================================================================
// OpenAI-specific request/response types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

/// Build OpenAI messages from our generic format
///
/// System prompts go into the messages array for OpenAI
fn build_openai_messages(system: Option<String>, messages: Vec<Message>) -> Vec<OpenAIMessage> {
    let system = system.map(|content| OpenAIMessage {
        role: "system",
        content,
    });

    system
        .into_iter()
        .chain(messages.into_iter().map(|msg| OpenAIMessage {
            role: match msg.role {
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::System => "system",
            },
            content: msg.content,
        }))
        .collect()
}

fn map_stop_reason(reason: &str) -> StopReason {
    match reason {
        "length" => StopReason::MaxTokens,
        "content_filter" => StopReason::ContentFiltered,
        _ => StopReason::EndTurn,
    }
}
