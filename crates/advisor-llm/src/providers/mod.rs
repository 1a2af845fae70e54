//! Concrete LLM provider implementations
//!
//! This module contains implementations of the LLMProvider trait for
//! the hosted services the advisor talks to.

use crate::{LLMError, Result};
use reqwest::Response;

#[cfg(feature = "gemini")]
pub mod gemini;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiConfig, GeminiProvider};

#[cfg(feature = "openai")]
pub use openai::{OpenAIConfig, OpenAIProvider};

/// Turn a non-success response into an [`LLMError`], passing successes through
async fn check_status(response: Response, model: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await?;
    Err(LLMError::from_status(status.as_u16(), body, model))
}
