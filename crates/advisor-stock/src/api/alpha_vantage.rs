//! Alpha Vantage API client

use crate::config::{DataSettings, MAX_INCOME_STATEMENT_YEARS};
use crate::error::{AdvisorError, Result};
use crate::financials::{CompanyProfile, IncomePeriod, IncomeStatement, render_financials};
use crate::sources::FinancialData;
use crate::ticker::{BSE_SUFFIX, NSE_SUFFIX, Ticker};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, info, instrument};

const PROVIDER: &str = "Alpha Vantage";

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Alpha Vantage API client
#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    client: Client,
    base_url: String,
    api_key: String,
    rate_limiter: SharedRateLimiter,
    years: usize,
}

/// Company overview data; Alpha Vantage sends every number as a string
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CompanyOverview {
    symbol: String,
    name: Option<String>,
    description: Option<String>,
    exchange: Option<String>,
    currency: Option<String>,
    sector: Option<String>,
    industry: Option<String>,
    asset_type: Option<String>,
    #[serde(rename = "MarketCapitalization")]
    market_cap: Option<String>,
    #[serde(rename = "PERatio")]
    pe_ratio: Option<String>,
    #[serde(rename = "EPS")]
    eps: Option<String>,
    dividend_yield: Option<String>,
    #[serde(rename = "52WeekHigh")]
    week_52_high: Option<String>,
    #[serde(rename = "52WeekLow")]
    week_52_low: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncomeStatementResponse {
    #[serde(default)]
    annual_reports: Vec<AnnualReport>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnualReport {
    fiscal_date_ending: String,
    reported_currency: Option<String>,
    total_revenue: Option<String>,
    gross_profit: Option<String>,
    operating_income: Option<String>,
    ebitda: Option<String>,
    net_income: Option<String>,
}

/// Parse an Alpha Vantage numeric field; `"None"` and `"-"` mean missing
fn number(value: Option<&String>) -> Option<f64> {
    value.and_then(|v| v.trim().parse::<f64>().ok())
}

fn text(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty() && v != "None" && v != "-")
}

/// Alpha Vantage lists Indian equities under `.BSE`
fn provider_symbol(ticker: &Ticker) -> String {
    let symbol = ticker.symbol();
    symbol
        .strip_suffix(NSE_SUFFIX)
        .or_else(|| symbol.strip_suffix(BSE_SUFFIX))
        .map_or_else(|| symbol.to_string(), |base| format!("{base}.BSE"))
}

impl AlphaVantageClient {
    /// Create a new Alpha Vantage client with API key and rate limit
    ///
    /// # Arguments
    /// * `api_key` - Alpha Vantage API key
    /// * `rate_limit` - Maximum requests per minute (5 on the free tier)
    pub fn new(api_key: impl Into<String>, rate_limit: u32) -> Result<Self> {
        let settings = DataSettings {
            alpha_vantage_api_key: Some(api_key.into()),
            alpha_vantage_rate_limit: rate_limit,
            ..Default::default()
        };
        Self::from_settings(&settings)
    }

    /// Create a client from data settings
    pub fn from_settings(settings: &DataSettings) -> Result<Self> {
        let api_key = settings.alpha_vantage_api_key.clone().ok_or_else(|| {
            AdvisorError::ConfigError("ALPHA_VANTAGE_API_KEY is not set".to_string())
        })?;

        let quota = Quota::per_minute(
            NonZeroU32::new(settings.alpha_vantage_rate_limit).unwrap_or(NonZeroU32::MIN),
        );

        Ok(Self {
            client: super::http_client(settings.request_timeout_secs)?,
            base_url: settings.alpha_vantage_api_base.trim_end_matches('/').to_string(),
            api_key,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            years: settings
                .income_statement_years
                .clamp(1, MAX_INCOME_STATEMENT_YEARS),
        })
    }

    /// Point the client at a different host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Run one `function` query and check for Alpha Vantage error payloads
    async fn query(&self, function: &str, symbol: &str) -> Result<serde_json::Value> {
        // Wait for rate limiter
        self.rate_limiter.until_ready().await;
        debug!("{PROVIDER} {function} {symbol}");

        let response = self
            .client
            .get(format!("{}/query", self.base_url))
            .query(&[
                ("function", function),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AdvisorError::AlphaVantageError(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let data: serde_json::Value = response.json().await?;

        if let Some(error) = data.get("Error Message").and_then(|e| e.as_str()) {
            return Err(AdvisorError::AlphaVantageError(error.to_string()));
        }

        // Both keys carry the free-tier limit notices
        if data.get("Note").is_some() || data.get("Information").is_some() {
            return Err(AdvisorError::RateLimitExceeded {
                provider: PROVIDER.to_string(),
            });
        }

        if data.as_object().is_none_or(serde_json::Map::is_empty) {
            return Err(AdvisorError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("{PROVIDER} returned no {function} data"),
            });
        }

        Ok(data)
    }

    /// Company overview and fundamental ratios
    #[instrument(skip(self))]
    pub async fn get_profile(&self, symbol: &str) -> Result<CompanyProfile> {
        let data = self.query("OVERVIEW", symbol).await?;
        let overview: CompanyOverview = serde_json::from_value(data)?;

        Ok(CompanyProfile {
            symbol: overview.symbol,
            name: text(overview.name),
            exchange: text(overview.exchange),
            sector: text(overview.sector),
            industry: text(overview.industry),
            currency: text(overview.currency),
            instrument_type: text(overview.asset_type),
            market_cap: number(overview.market_cap.as_ref()),
            pe_ratio: number(overview.pe_ratio.as_ref()),
            eps: number(overview.eps.as_ref()),
            dividend_yield: number(overview.dividend_yield.as_ref()),
            fifty_two_week_high: number(overview.week_52_high.as_ref()),
            fifty_two_week_low: number(overview.week_52_low.as_ref()),
            description: text(overview.description),
            ..Default::default()
        })
    }

    /// Annual income statement, newest period first
    #[instrument(skip(self))]
    pub async fn get_income_statement(&self, symbol: &str) -> Result<IncomeStatement> {
        let data = self.query("INCOME_STATEMENT", symbol).await?;
        let response: IncomeStatementResponse = serde_json::from_value(data)?;

        let mut statement = IncomeStatement {
            periods: response
                .annual_reports
                .into_iter()
                .map(|report| IncomePeriod {
                    as_of: report.fiscal_date_ending,
                    currency: text(report.reported_currency),
                    total_revenue: number(report.total_revenue.as_ref()),
                    gross_profit: number(report.gross_profit.as_ref()),
                    operating_income: number(report.operating_income.as_ref()),
                    ebitda: number(report.ebitda.as_ref()),
                    net_income: number(report.net_income.as_ref()),
                    diluted_eps: None,
                })
                .collect(),
        };
        statement.sort();
        statement.periods.truncate(self.years);
        Ok(statement)
    }

    /// Latest traded price from the global quote
    #[instrument(skip(self))]
    pub async fn get_latest_price(&self, symbol: &str) -> Result<f64> {
        let data = self.query("GLOBAL_QUOTE", symbol).await?;
        data.get("Global Quote")
            .and_then(|quote| quote.get("05. price"))
            .and_then(|price| price.as_str())
            .and_then(|price| price.parse().ok())
            .ok_or_else(|| AdvisorError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "No price in global quote".to_string(),
            })
    }
}

#[async_trait]
impl FinancialData for AlphaVantageClient {
    async fn fetch_financials(&self, ticker: &Ticker) -> Result<String> {
        let symbol = provider_symbol(ticker);
        let profile = self.get_profile(&symbol).await?;
        let statement = self.get_income_statement(&symbol).await?;
        info!(
            "Fetched {} profile and {} income periods from {PROVIDER}",
            symbol,
            statement.periods.len()
        );
        Ok(render_financials(ticker, &profile, &statement))
    }

    async fn latest_price(&self, ticker: &Ticker) -> Result<f64> {
        self.get_latest_price(&provider_symbol(ticker)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticker::SymbolNormalizer;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AlphaVantageClient {
        AlphaVantageClient::new("demo", 600)
            .unwrap()
            .with_base_url(server.uri())
    }

    #[test]
    fn test_client_creation() {
        let client = AlphaVantageClient::new("test_key", 5).unwrap();
        assert_eq!(client.api_key, "test_key");
        assert_eq!(client.base_url, "https://www.alphavantage.co");
    }

    #[test]
    fn test_missing_key() {
        assert!(matches!(
            AlphaVantageClient::from_settings(&DataSettings::default()),
            Err(AdvisorError::ConfigError(_))
        ));
    }

    #[test]
    fn test_provider_symbol() {
        let normalizer = SymbolNormalizer::default();
        let tata = normalizer.normalize("TATA MOTORS").unwrap();
        assert_eq!(provider_symbol(&tata), "TATAMOTORS.BSE");
        let ibm = normalizer.normalize("ibm").unwrap();
        assert_eq!(provider_symbol(&ibm), "IBM");
    }

    #[tokio::test]
    async fn test_get_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", "OVERVIEW"))
            .and(query_param("symbol", "IBM"))
            .and(query_param("apikey", "demo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Symbol": "IBM",
                "AssetType": "Common Stock",
                "Name": "International Business Machines",
                "Description": "IBM is an American multinational technology company.",
                "Exchange": "NYSE",
                "Currency": "USD",
                "Sector": "TECHNOLOGY",
                "Industry": "COMPUTER & OFFICE EQUIPMENT",
                "MarketCapitalization": "156000000000",
                "PERatio": "22.5",
                "EPS": "7.6",
                "DividendYield": "None",
                "52WeekHigh": "199.18",
                "52WeekLow": "120.55"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let profile = client_for(&server).get_profile("IBM").await.unwrap();
        assert_eq!(profile.name.as_deref(), Some("International Business Machines"));
        assert_eq!(profile.market_cap, Some(156_000_000_000.0));
        assert_eq!(profile.pe_ratio, Some(22.5));
        assert_eq!(profile.dividend_yield, None);
        assert_eq!(profile.fifty_two_week_low, Some(120.55));
    }

    #[tokio::test]
    async fn test_get_income_statement() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("function", "INCOME_STATEMENT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "symbol": "IBM",
                "annualReports": [
                    { "fiscalDateEnding": "2022-12-31", "reportedCurrency": "USD",
                      "totalRevenue": "60530000000", "netIncome": "1640000000" },
                    { "fiscalDateEnding": "2023-12-31", "reportedCurrency": "USD",
                      "totalRevenue": "61860000000", "netIncome": "7502000000",
                      "ebitda": "None" }
                ],
                "quarterlyReports": []
            })))
            .mount(&server)
            .await;

        let statement = client_for(&server)
            .get_income_statement("IBM")
            .await
            .unwrap();
        assert_eq!(statement.periods.len(), 2);
        assert_eq!(statement.periods[0].as_of, "2023-12-31");
        assert_eq!(statement.periods[0].net_income, Some(7_502_000_000.0));
        assert_eq!(statement.periods[0].ebitda, None);
    }

    #[tokio::test]
    async fn test_get_latest_price() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("function", "GLOBAL_QUOTE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Global Quote": { "01. symbol": "IBM", "05. price": "170.2500" }
            })))
            .mount(&server)
            .await;

        let price = client_for(&server).get_latest_price("IBM").await.unwrap();
        assert!((price - 170.25).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_error_payloads() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("symbol", "BAD"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Error Message": "Invalid API call."
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("symbol", "BUSY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Information": "Our standard API rate limit is 25 requests per day."
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("symbol", "EMPTY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(matches!(
            client.get_profile("BAD").await,
            Err(AdvisorError::AlphaVantageError(_))
        ));
        assert!(matches!(
            client.get_profile("BUSY").await,
            Err(AdvisorError::RateLimitExceeded { .. })
        ));
        assert!(matches!(
            client.get_profile("EMPTY").await,
            Err(AdvisorError::DataUnavailable { .. })
        ));
    }
}
