//! Capability traits for the three external services
//!
//! The pipeline only ever talks to these traits, so stages can run against
//! deterministic stand-ins in tests.

use crate::error::Result;
use crate::prompts::Persona;
use crate::ticker::Ticker;
use async_trait::async_trait;

/// Read-only access to a financial-data provider
#[async_trait]
pub trait FinancialData: Send + Sync {
    /// Company profile and income statement, formatted as text
    async fn fetch_financials(&self, ticker: &Ticker) -> Result<String>;

    /// Latest traded price
    async fn latest_price(&self, ticker: &Ticker) -> Result<f64>;
}

/// Web search for recent news
#[async_trait]
pub trait NewsSearch: Send + Sync {
    /// Run one search query and format the hits as text
    async fn search_news(&self, query: &str) -> Result<String>;
}

/// Text completion by a hosted LLM
#[async_trait]
pub trait TextCompleter: Send + Sync {
    /// Complete `prompt` in the voice of `persona`, with the outputs of
    /// earlier stages as `context`
    async fn complete(&self, persona: &Persona, prompt: &str, context: &[String])
    -> Result<String>;
}
