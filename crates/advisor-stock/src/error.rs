//! Error types for the advisor pipeline

use thiserror::Error;

/// Errors raised while normalizing, researching or writing a recommendation
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// Input could not be turned into a ticker
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Data not available for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// API request failed
    #[error("API error: {0}")]
    ApiError(String),

    /// Rate limit exceeded for API
    #[error("Rate limit exceeded for {provider}")]
    RateLimitExceeded { provider: String },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// Alpha Vantage API error
    #[error("Alpha Vantage error: {0}")]
    AlphaVantageError(String),

    /// LLM provider error
    #[error("LLM error: {0}")]
    LlmError(#[from] advisor_llm::LLMError),

    /// Report could not be written
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Prompt template failed to render
    #[error("Template error: {0}")]
    TemplateError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for advisor operations
pub type Result<T> = std::result::Result<T, AdvisorError>;

impl From<minijinja::Error> for AdvisorError {
    fn from(err: minijinja::Error) -> Self {
        AdvisorError::TemplateError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AdvisorError::InvalidSymbol("empty input".to_string());
        assert_eq!(err.to_string(), "Invalid symbol: empty input");

        let err = AdvisorError::DataUnavailable {
            symbol: "TATAMOTORS.NS".to_string(),
            reason: "No data found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Data not available for TATAMOTORS.NS: No data found"
        );
    }

    #[test]
    fn test_llm_error_conversion() {
        let err: AdvisorError = advisor_llm::LLMError::AuthenticationFailed.into();
        assert!(matches!(err, AdvisorError::LlmError(_)));
        assert!(err.to_string().starts_with("LLM error"));
    }
}
