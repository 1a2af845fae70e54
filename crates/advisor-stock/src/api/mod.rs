//! API clients for the research stages

pub mod alpha_vantage;
pub mod duckduckgo;
pub mod yahoo;

pub use alpha_vantage::AlphaVantageClient;
pub use duckduckgo::{DuckDuckGoClient, SearchHit};
pub use yahoo::YahooFinanceClient;

use crate::error::Result;
use reqwest::Client;
use std::time::Duration;

/// Both Yahoo and DuckDuckGo turn away requests without a browser user agent
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Shared HTTP client setup
fn http_client(timeout_secs: u64) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}
