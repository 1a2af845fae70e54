//! Stock research and recommendation pipeline
//!
//! This crate turns a symbol or company name into two Markdown documents:
//! an analysis of the company's financial health and a Buy/Hold/Sell
//! recommendation. It includes:
//!
//! - Symbol normalization with the NSE `.NS` rule for Indian companies
//! - Financial data from Yahoo Finance or Alpha Vantage
//! - News search through DuckDuckGo
//! - Two LLM passes (analyst, then financial expert) over the research text
//!
//! # Architecture
//!
//! The [`Pipeline`] talks to three capability traits:
//! - [`FinancialData`]: company profile, income statement and live price
//! - [`NewsSearch`]: web search for recent news
//! - [`TextCompleter`]: completion by a hosted model, see [`LlmCompleter`]
//!
//! # Example
//!
//! ```rust,ignore
//! use advisor_stock::{AdvisorConfig, Pipeline};
//! use advisor_utils::ProcessEnv;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AdvisorConfig::load(None, &ProcessEnv)?;
//!     let pipeline = Pipeline::from_config(config)?;
//!
//!     let report = pipeline.run("TATA MOTORS").await?;
//!     println!("{}", report.recommendation);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod completer;
pub mod config;
pub mod error;
pub mod financials;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod sources;
pub mod ticker;

// Re-export main types for convenience
pub use completer::LlmCompleter;
pub use config::{AdvisorConfig, DataProvider, LlmBackend};
pub use error::{AdvisorError, Result};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineReport};
pub use prompts::Persona;
pub use sources::{FinancialData, NewsSearch, TextCompleter};
pub use ticker::{SymbolNormalizer, Ticker};
