//! [`TextCompleter`] backed by an [`LLMProvider`]

use advisor_llm::providers::{GeminiConfig, GeminiProvider, OpenAIConfig, OpenAIProvider};
use advisor_llm::{CompletionRequest, LLMProvider, Message, StopReason};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::config::{LlmBackend, LlmSettings};
use crate::error::{AdvisorError, Result};
use crate::prompts::Persona;
use crate::sources::TextCompleter;

/// Sends persona + task + context to a hosted model
pub struct LlmCompleter {
    provider: Arc<dyn LLMProvider>,
    model: String,
    max_tokens: usize,
    temperature: Option<f32>,
}

impl LlmCompleter {
    /// Wrap an existing provider
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: 4096,
            temperature: None,
        }
    }

    /// Set the maximum tokens per completion
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Build the configured provider
    ///
    /// Fails with a configuration error when the API key is missing.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        let api_key = settings.api_key.clone().ok_or_else(|| {
            AdvisorError::ConfigError(format!(
                "{} is not set; export it or add it to .env",
                settings.provider.key_var()
            ))
        })?;

        let provider: Arc<dyn LLMProvider> = match settings.provider {
            LlmBackend::Gemini => {
                let mut config = GeminiConfig::new(api_key).with_timeout(settings.timeout_secs);
                if let Some(base) = &settings.api_base {
                    config = config.with_api_base(base.as_str());
                }
                Arc::new(GeminiProvider::with_config(config)?)
            }
            LlmBackend::OpenAI => {
                let mut config = OpenAIConfig::new(api_key).with_timeout(settings.timeout_secs);
                if let Some(base) = &settings.api_base {
                    config = config.with_api_base(base.as_str());
                }
                Arc::new(OpenAIProvider::with_config(config)?)
            }
        };

        info!(
            provider = provider.name(),
            model = settings.model_name(),
            "LLM provider ready"
        );

        Ok(Self::new(provider, settings.model_name())
            .with_max_tokens(settings.max_tokens)
            .with_temperature(settings.temperature))
    }

    /// Model identifier sent with each request
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Build the user message: earlier stage outputs first, then the task
pub fn compose_prompt(prompt: &str, context: &[String]) -> String {
    let context: Vec<&str> = context
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();

    if context.is_empty() {
        return prompt.to_string();
    }

    format!(
        "{prompt}\n\nThis is the context you're working with:\n{}",
        context.join("\n\n----------\n\n")
    )
}

#[async_trait]
impl TextCompleter for LlmCompleter {
    #[instrument(skip(self, prompt, context), fields(role = %persona.role, model = %self.model))]
    async fn complete(
        &self,
        persona: &Persona,
        prompt: &str,
        context: &[String],
    ) -> Result<String> {
        let mut builder = CompletionRequest::builder(&self.model)
            .system(persona.system_prompt())
            .add_message(Message::user(compose_prompt(prompt, context)))
            .max_tokens(self.max_tokens);
        if let Some(temperature) = self.temperature {
            builder = builder.temperature(temperature);
        }

        let response = self.provider.complete(builder.build()).await?;
        debug!(
            "Completion finished - stop_reason: {:?}, tokens: {}",
            response.stop_reason,
            response.usage.total()
        );

        match response.stop_reason {
            StopReason::ContentFiltered => {
                return Err(AdvisorError::ApiError(format!(
                    "{} withheld the {} response",
                    self.provider.name(),
                    persona.role
                )));
            }
            StopReason::MaxTokens => {
                warn!("{} response truncated at {} tokens", persona.role, self.max_tokens);
            }
            StopReason::EndTurn | StopReason::StopSequence => {}
        }

        let text = response.text().trim();
        if text.is_empty() {
            return Err(AdvisorError::ApiError(format!(
                "{} returned an empty response for {}",
                self.provider.name(),
                persona.role
            )));
        }

        Ok(text.to_string())
    }
}
