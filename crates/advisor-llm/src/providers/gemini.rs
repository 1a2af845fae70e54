//! Google Gemini provider implementation
//!
//! This module implements the LLMProvider trait against the Gemini
//! `generateContent` REST endpoint.
//! See: https://ai.google.dev/api/generate-content
//!
//! # Example
//!
//! ```no_run
//! use advisor_llm::{CompletionRequest, LLMProvider, Message};
//! use advisor_llm::providers::GeminiProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads GOOGLE_API_KEY (or GEMINI_API_KEY)
//!     let provider = GeminiProvider::from_env()?;
//!
//!     let request = CompletionRequest::builder("gemini-2.5-flash-lite")
//!         .system("You are a terse assistant.")
//!         .add_message(Message::user("Hello!"))
//!         .max_tokens(100)
//!         .build();
//!
//!     let response = provider.complete(request).await?;
//!     println!("{}", response.text());
//!     Ok(())
//! }
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

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Environment variables checked for the API key, in order
pub const API_KEY_VARS: &[&str] = &["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// Configuration for the Gemini provider
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base URL for the API (default: "https://generativelanguage.googleapis.com/v1beta")
    pub api_base: String,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl GeminiConfig {
    /// Create a new config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Create config from environment variables
    ///
    /// Reads the API key from `GOOGLE_API_KEY`, then `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = API_KEY_VARS
            .iter()
            .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
            .ok_or_else(|| {
                LLMError::ConfigurationError(
                    "GOOGLE_API_KEY environment variable not set".to_string(),
                )
            })?;

        Ok(Self::new(api_key))
    }

    /// Set custom API base URL
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

/// Gemini provider
///
/// Works with any model served by `generateContent`, e.g.
/// - gemini-2.5-flash-lite
/// - gemini-2.5-flash
/// - gemini-2.5-pro
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Create a provider with custom configuration
    pub fn with_config(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LLMError::ConfigurationError(
                "Gemini API key is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a provider with API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(GeminiConfig::new(api_key))
    }

    /// Create a provider from environment variables
    pub fn from_env() -> Result<Self> {
        Self::with_config(GeminiConfig::from_env()?)
    }

    /// Get the current configuration
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base,
            normalize_model(model)
        )
    }
}

/// Strip routing prefixes such as `gemini/` or `models/` from a model name
fn normalize_model(model: &str) -> &str {
    let model = model.strip_prefix("gemini/").unwrap_or(model);
    model.strip_prefix("models/").unwrap_or(model)
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!("Sending request to Gemini API");

        let model = request.model.clone();
        let gemini_request = build_request(request);

        let response = self
            .client
            .post(self.endpoint(&model))
            .header("x-goog-api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&gemini_request)
            .send()
            .await?;

        let response = check_status(response, &model).await?;

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        convert_response(gemini_response)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

// ============================================================================
// Gemini-specific request/response types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

// ============================================================================
// Conversion functions
// ============================================================================

fn text_content(role: Option<&str>, text: String) -> GeminiContent {
    GeminiContent {
        role: role.map(str::to_string),
        parts: vec![GeminiPart { text: Some(text) }],
    }
}

/// Build a Gemini request from our generic format
///
/// Gemini calls the assistant role "model" and carries the system prompt
/// separately as `systemInstruction`.
fn build_request(request: CompletionRequest) -> GeminiRequest {
    let mut system = request.system;
    let mut contents = Vec::with_capacity(request.messages.len());

    for message in request.messages {
        match message.role {
            Role::User => contents.push(text_content(Some("user"), message.content)),
            Role::Assistant => contents.push(text_content(Some("model"), message.content)),
            Role::System => {
                system = Some(match system.take() {
                    Some(existing) => format!("{existing}\n\n{}", message.content),
                    None => message.content,
                });
            }
        }
    }

    GeminiRequest {
        contents,
        system_instruction: system.map(|s| text_content(None, s)),
        generation_config: GenerationConfig {
            max_output_tokens: request.max_tokens,
            temperature: request.temperature,
            stop_sequences: request.stop_sequences,
        },
    }
}

fn convert_response(response: GeminiResponse) -> Result<CompletionResponse> {
    let usage = response
        .usage_metadata
        .map(|u| TokenUsage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        })
        .unwrap_or_default();

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "none given".to_string());
        return Err(LLMError::UnexpectedResponse(format!(
            "No candidates in response (block reason: {reason})"
        )));
    };

    let text = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    let finish_reason = candidate.finish_reason.unwrap_or_default();
    debug!(
        "Received response - finish_reason: {}, tokens: {}/{}",
        finish_reason, usage.input_tokens, usage.output_tokens
    );

    Ok(CompletionResponse {
        message: Message::assistant(text),
        stop_reason: map_stop_reason(&finish_reason),
        usage,
    })
}

fn map_stop_reason(reason: &str) -> StopReason {
    match reason {
        "MAX_TOKENS" => StopReason::MaxTokens,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
            StopReason::ContentFiltered
        }
        _ => StopReason::EndTurn,
    }
}
