//! Configuration for the advisor pipeline
//!
//! Resolution order: built-in defaults, then a JSON file, then the
//! environment. Stage logic only ever sees the resolved [`AdvisorConfig`].

use crate::error::{AdvisorError, Result};
use crate::ticker::SymbolSettings;
use advisor_utils::EnvLookup;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "advisor.json";

/// Upper bound for `data.income_statement_years`
pub const MAX_INCOME_STATEMENT_YEARS: usize = 20;

/// Hosted model backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Google Gemini (default)
    #[default]
    Gemini,
    /// Any OpenAI-compatible chat completions endpoint
    #[serde(rename = "openai")]
    OpenAI,
}

impl LlmBackend {
    /// Environment variables holding the credential, in lookup order
    pub fn key_vars(self) -> &'static [&'static str] {
        match self {
            Self::Gemini => &["GOOGLE_API_KEY", "GEMINI_API_KEY"],
            Self::OpenAI => &["OPENAI_API_KEY"],
        }
    }

    /// Primary credential variable, used in error messages
    pub fn key_var(self) -> &'static str {
        self.key_vars()[0]
    }

    /// Model used when none is configured
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.5-flash-lite",
            Self::OpenAI => "gpt-4o-mini",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            "openai" => Some(Self::OpenAI),
            _ => None,
        }
    }
}

/// Financial-data backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataProvider {
    /// Yahoo Finance (default, no API key required)
    #[default]
    Yahoo,
    /// Alpha Vantage (requires API key)
    AlphaVantage,
}

/// LLM settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: LlmBackend,
    /// Model name; the backend default when unset
    pub model: Option<String>,
    /// Credential, normally taken from the environment
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Override for the provider's base URL
    pub api_base: Option<String>,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmBackend::Gemini,
            model: None,
            api_key: None,
            api_base: None,
            temperature: 0.2,
            max_tokens: 4096,
            timeout_secs: 120,
        }
    }
}

impl LlmSettings {
    /// Configured model or the backend default
    pub fn model_name(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }
}

/// Financial-data settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub provider: DataProvider,
    #[serde(skip_serializing)]
    pub alpha_vantage_api_key: Option<String>,
    /// Alpha Vantage requests per minute (free tier: 5)
    pub alpha_vantage_rate_limit: u32,
    pub yahoo_api_base: String,
    pub alpha_vantage_api_base: String,
    pub request_timeout_secs: u64,
    /// Annual periods of income statement to include
    pub income_statement_years: usize,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            provider: DataProvider::Yahoo,
            alpha_vantage_api_key: None,
            alpha_vantage_rate_limit: 5,
            yahoo_api_base: "https://query1.finance.yahoo.com".to_string(),
            alpha_vantage_api_base: "https://www.alphavantage.co".to_string(),
            request_timeout_secs: 30,
            income_statement_years: 4,
        }
    }
}

/// News search settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsSettings {
    /// Query templates; `{{ stock }}`, `{{ ticker }}`, `{{ today }}` are available
    pub queries: Vec<String>,
    pub max_results: usize,
    pub api_base: String,
    pub request_timeout_secs: u64,
}

impl Default for NewsSettings {
    fn default() -> Self {
        Self {
            queries: vec!["{{ stock }} latest news".to_string()],
            max_results: 5,
            api_base: "https://html.duckduckgo.com".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Where the two reports are written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub dir: PathBuf,
    pub analysis_file: String,
    pub recommendation_file: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            analysis_file: "Analysis.md".to_string(),
            recommendation_file: "Recommendation.md".to_string(),
        }
    }
}

impl OutputSettings {
    pub fn analysis_path(&self) -> PathBuf {
        self.dir.join(&self.analysis_file)
    }

    pub fn recommendation_path(&self) -> PathBuf {
        self.dir.join(&self.recommendation_file)
    }
}

/// Complete advisor configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub llm: LlmSettings,
    pub data: DataSettings,
    pub news: NewsSettings,
    pub output: OutputSettings,
    pub symbols: SymbolSettings,
    /// Run the two research stages at the same time
    pub concurrent_research: bool,
    /// Have the research personas summarize raw research text before analysis
    pub summarize_research: bool,
}

impl AdvisorConfig {
    /// Create a new configuration builder
    pub fn builder() -> AdvisorConfigBuilder {
        AdvisorConfigBuilder::default()
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AdvisorError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            AdvisorError::ConfigError(format!("invalid config {}: {e}", path.display()))
        })
    }

    /// Resolve the configuration
    ///
    /// Reads `path` if given, otherwise [`DEFAULT_CONFIG_FILE`] when it exists,
    /// then applies the environment on top.
    pub fn load(path: Option<&Path>, env: &impl EnvLookup) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };
        config.apply_env(env)?;
        Ok(config)
    }

    /// Overlay environment variables
    pub fn apply_env(&mut self, env: &impl EnvLookup) -> Result<()> {
        if let Some(provider) = env.var("ADVISOR_LLM_PROVIDER") {
            self.llm.provider = LlmBackend::parse(&provider).ok_or_else(|| {
                AdvisorError::ConfigError(format!(
                    "ADVISOR_LLM_PROVIDER must be gemini or openai, got {provider:?}"
                ))
            })?;
        }
        if let Some(model) = env.var("ADVISOR_MODEL") {
            self.llm.model = Some(model);
        }
        if let Some(key) = env.first_of(self.llm.provider.key_vars()) {
            self.llm.api_key = Some(key);
        }
        if self.llm.provider == LlmBackend::OpenAI {
            if let Some(base) = env.var("OPENAI_API_BASE") {
                self.llm.api_base = Some(base);
            }
        }
        if let Some(key) = env.var("ALPHA_VANTAGE_API_KEY") {
            self.data.alpha_vantage_api_key = Some(key);
        }
        if let Some(dir) = env.var("ADVISOR_OUTPUT_DIR") {
            self.output.dir = PathBuf::from(dir);
        }

        debug!(
            provider = ?self.llm.provider,
            model = self.llm.model_name(),
            data = ?self.data.provider,
            "Resolved configuration"
        );
        Ok(())
    }

    /// Validate the configuration
    ///
    /// Missing credentials are reported here, before any network call.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.is_none() {
            return Err(AdvisorError::ConfigError(format!(
                "{} is not set; export it or add it to .env",
                self.llm.provider.key_vars().join(" or ")
            )));
        }

        if self.data.provider == DataProvider::AlphaVantage
            && self.data.alpha_vantage_api_key.is_none()
        {
            return Err(AdvisorError::ConfigError(
                "ALPHA_VANTAGE_API_KEY is required when using the alpha_vantage provider"
                    .to_string(),
            ));
        }

        if !(1..=MAX_INCOME_STATEMENT_YEARS).contains(&self.data.income_statement_years) {
            return Err(AdvisorError::ConfigError(format!(
                "data.income_statement_years must be between 1 and {MAX_INCOME_STATEMENT_YEARS}, got {}",
                self.data.income_statement_years
            )));
        }

        if self.news.queries.is_empty() {
            return Err(AdvisorError::ConfigError(
                "news.queries must contain at least one query".to_string(),
            ));
        }

        if self.news.max_results == 0 {
            return Err(AdvisorError::ConfigError(
                "news.max_results must be greater than 0".to_string(),
            ));
        }

        if self.output.analysis_file.trim().is_empty()
            || self.output.recommendation_file.trim().is_empty()
        {
            return Err(AdvisorError::ConfigError(
                "output file names must not be empty".to_string(),
            ));
        }

        if self.output.analysis_file == self.output.recommendation_file {
            return Err(AdvisorError::ConfigError(
                "analysis and recommendation must go to different files".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`AdvisorConfig`]
#[derive(Debug, Default)]
pub struct AdvisorConfigBuilder {
    config: AdvisorConfig,
}

impl AdvisorConfigBuilder {
    /// Set the LLM backend
    pub fn llm_provider(mut self, provider: LlmBackend) -> Self {
        self.config.llm.provider = provider;
        self
    }

    /// Set the model name
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.llm.model = Some(model.into());
        self
    }

    /// Set the LLM API key
    pub fn llm_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.llm.api_key = Some(key.into());
        self
    }

    /// Set the financial-data backend
    pub fn data_provider(mut self, provider: DataProvider) -> Self {
        self.config.data.provider = provider;
        self
    }

    /// Set the Alpha Vantage API key
    pub fn alpha_vantage_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.data.alpha_vantage_api_key = Some(key.into());
        self
    }

    /// Replace the news query templates
    pub fn news_queries<I, S>(mut self, queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.news.queries = queries.into_iter().map(Into::into).collect();
        self
    }

    /// Set the directory the reports are written to
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output.dir = dir.into();
        self
    }

    /// Replace the symbol table settings
    pub fn symbols(mut self, symbols: SymbolSettings) -> Self {
        self.config.symbols = symbols;
        self
    }

    /// Run the research stages concurrently
    pub fn concurrent_research(mut self, enabled: bool) -> Self {
        self.config.concurrent_research = enabled;
        self
    }

    /// Summarize research through the research personas
    pub fn summarize_research(mut self, enabled: bool) -> Self {
        self.config.summarize_research = enabled;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<AdvisorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = AdvisorConfig::default();
        assert_eq!(config.llm.provider, LlmBackend::Gemini);
        assert_eq!(config.llm.model_name(), "gemini-2.5-flash-lite");
        assert_eq!(config.data.provider, DataProvider::Yahoo);
        assert_eq!(config.news.queries, vec!["{{ stock }} latest news"]);
        assert_eq!(config.output.analysis_path(), PathBuf::from("./Analysis.md"));
        assert!(!config.concurrent_research);
        // no credential yet
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = AdvisorConfig::builder()
            .llm_provider(LlmBackend::OpenAI)
            .llm_api_key("sk-test")
            .output_dir("/tmp/reports")
            .concurrent_research(true)
            .build()
            .unwrap();

        assert_eq!(config.llm.model_name(), "gpt-4o-mini");
        assert_eq!(
            config.output.recommendation_path(),
            PathBuf::from("/tmp/reports/Recommendation.md")
        );
        assert!(config.concurrent_research);
    }

    #[test]
    fn test_missing_key_names_variable() {
        let err = AdvisorConfig::default().validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("GOOGLE_API_KEY"));
        assert!(message.contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_validation_alpha_vantage_no_key() {
        let result = AdvisorConfig::builder()
            .llm_api_key("key")
            .data_provider(DataProvider::AlphaVantage)
            .build();
        assert!(result.is_err());

        let result = AdvisorConfig::builder()
            .llm_api_key("key")
            .data_provider(DataProvider::AlphaVantage)
            .alpha_vantage_api_key("av")
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_validation_rejects_empty_queries() {
        let result = AdvisorConfig::builder()
            .llm_api_key("key")
            .news_queries(Vec::<String>::new())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_bounds_income_years() {
        let mut config = AdvisorConfig::builder().llm_api_key("key").build().unwrap();

        config.data.income_statement_years = usize::MAX;
        assert!(matches!(config.validate(), Err(AdvisorError::ConfigError(_))));

        config.data.income_statement_years = 0;
        assert!(config.validate().is_err());

        config.data.income_statement_years = MAX_INCOME_STATEMENT_YEARS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_env() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("ADVISOR_LLM_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "sk-env"),
            ("OPENAI_API_BASE", "http://localhost:1234/v1"),
            ("ADVISOR_MODEL", "local-model"),
            ("ADVISOR_OUTPUT_DIR", "out"),
            ("GOOGLE_API_KEY", "ignored"),
        ]);

        let mut config = AdvisorConfig::default();
        config.apply_env(&env).unwrap();

        assert_eq!(config.llm.provider, LlmBackend::OpenAI);
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.llm.api_base.as_deref(), Some("http://localhost:1234/v1"));
        assert_eq!(config.llm.model_name(), "local-model");
        assert_eq!(config.output.dir, PathBuf::from("out"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_gemini_key_fallback() {
        let env: HashMap<&str, &str> = HashMap::from([("GEMINI_API_KEY", "g-key")]);
        let mut config = AdvisorConfig::default();
        config.apply_env(&env).unwrap();
        assert_eq!(config.llm.api_key.as_deref(), Some("g-key"));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let env: HashMap<&str, &str> = HashMap::from([("ADVISOR_LLM_PROVIDER", "claude")]);
        let mut config = AdvisorConfig::default();
        assert!(config.apply_env(&env).is_err());
    }

    #[test]
    fn test_from_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("advisor.json");
        std::fs::write(
            &path,
            r#"{
                "llm": { "model": "gemini-2.5-pro" },
                "news": { "queries": ["{{ stock }} results", "{{ ticker }} share price"] },
                "symbols": { "indian": { "Zomato": "ZOMATO" } },
                "concurrent_research": true
            }"#,
        )
        .unwrap();

        let env: HashMap<&str, &str> = HashMap::from([("GOOGLE_API_KEY", "key")]);
        let config = AdvisorConfig::load(Some(path.as_path()), &env).unwrap();

        assert_eq!(config.llm.model_name(), "gemini-2.5-pro");
        assert_eq!(config.news.queries.len(), 2);
        assert_eq!(config.news.max_results, 5);
        assert_eq!(config.symbols.indian.get("Zomato").map(String::as_str), Some("ZOMATO"));
        assert!(config.symbols.include_defaults);
        assert!(config.concurrent_research);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            AdvisorConfig::from_file(&path),
            Err(AdvisorError::ConfigError(_))
        ));
    }

    #[test]
    fn test_api_key_not_serialized() {
        let config = AdvisorConfig::builder().llm_api_key("secret").build().unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
