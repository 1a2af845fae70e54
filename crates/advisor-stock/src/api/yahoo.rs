//! Yahoo Finance API client
//!
//! The company profile comes from the chart endpoint's metadata, the income
//! statement from the fundamentals-timeseries endpoint, and the live price
//! from `yahoo_finance_api`.

use crate::config::{DataSettings, MAX_INCOME_STATEMENT_YEARS};
use crate::error::{AdvisorError, Result};
use crate::financials::{CompanyProfile, IncomePeriod, IncomeStatement, render_financials};
use crate::sources::FinancialData;
use crate::ticker::Ticker;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, instrument};
use url::Url;
use yahoo_finance_api as yahoo;

/// Annual income statement series requested from the timeseries endpoint
const INCOME_SERIES: [&str; 6] = [
    "annualTotalRevenue",
    "annualGrossProfit",
    "annualOperatingIncome",
    "annualEBITDA",
    "annualNetIncome",
    "annualDilutedEPS",
];

/// Yahoo Finance API client
#[derive(Debug, Clone)]
pub struct YahooFinanceClient {
    client: Client,
    base_url: String,
    years: usize,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<YahooErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: String,
    currency: Option<String>,
    full_exchange_name: Option<String>,
    exchange_name: Option<String>,
    instrument_type: Option<String>,
    long_name: Option<String>,
    short_name: Option<String>,
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
    fifty_two_week_high: Option<f64>,
    fifty_two_week_low: Option<f64>,
    regular_market_volume: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct YahooErrorBody {
    code: Option<String>,
    description: Option<String>,
}

impl YahooErrorBody {
    fn message(&self) -> String {
        match (&self.code, &self.description) {
            (Some(code), Some(description)) => format!("{code}: {description}"),
            (None, Some(text)) | (Some(text), None) => text.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TimeseriesResponse {
    timeseries: TimeseriesBody,
}

#[derive(Debug, Deserialize)]
struct TimeseriesBody {
    #[serde(default)]
    result: Option<Vec<TimeseriesResult>>,
    error: Option<YahooErrorBody>,
}

#[derive(Debug, Deserialize)]
struct TimeseriesResult {
    meta: TimeseriesMeta,
    /// Keyed by series name, e.g. `annualTotalRevenue`
    #[serde(flatten)]
    series: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TimeseriesMeta {
    #[serde(rename = "type", default)]
    kind: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeseriesPoint {
    as_of_date: String,
    currency_code: Option<String>,
    reported_value: ReportedValue,
}

#[derive(Debug, Deserialize)]
struct ReportedValue {
    raw: f64,
}

impl YahooFinanceClient {
    /// Create a client against the public endpoints
    pub fn new() -> Result<Self> {
        Self::from_settings(&DataSettings::default())
    }

    /// Create a client from data settings
    pub fn from_settings(settings: &DataSettings) -> Result<Self> {
        Ok(Self {
            client: super::http_client(settings.request_timeout_secs)?,
            base_url: settings.yahoo_api_base.trim_end_matches('/').to_string(),
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

    /// Endpoint URL with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let invalid =
            || AdvisorError::ConfigError(format!("invalid Yahoo base URL {}", self.base_url));
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Company profile from the chart metadata
    #[instrument(skip(self))]
    pub async fn get_profile(&self, symbol: &str) -> Result<CompanyProfile> {
        let url = self.endpoint(&["v8", "finance", "chart", symbol])?;
        debug!("GET {url}");

        let response = self
            .client
            .get(url)
            .query(&[("range", "1d"), ("interval", "1d")])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AdvisorError::RateLimitExceeded {
                provider: "Yahoo Finance".to_string(),
            });
        }
        let body = response.text().await?;

        // Unknown symbols come back as 404 with a chart.error body
        let parsed: ChartResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(AdvisorError::YahooFinanceError(format!("HTTP {status}")));
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(error) = parsed.chart.error {
            return Err(AdvisorError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: error.message(),
            });
        }

        let meta = parsed
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .map(|result| result.meta)
            .ok_or_else(|| AdvisorError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "No chart data returned".to_string(),
            })?;

        Ok(CompanyProfile {
            symbol: meta.symbol,
            name: meta.long_name.or(meta.short_name),
            exchange: meta.full_exchange_name.or(meta.exchange_name),
            currency: meta.currency,
            instrument_type: meta.instrument_type,
            market_price: meta.regular_market_price,
            previous_close: meta.previous_close.or(meta.chart_previous_close),
            fifty_two_week_high: meta.fifty_two_week_high,
            fifty_two_week_low: meta.fifty_two_week_low,
            volume: meta.regular_market_volume,
            ..Default::default()
        })
    }

    /// Annual income statement, newest period first
    #[instrument(skip(self))]
    pub async fn get_income_statement(&self, symbol: &str) -> Result<IncomeStatement> {
        let url = self.endpoint(&[
            "ws",
            "fundamentals-timeseries",
            "v1",
            "finance",
            "timeseries",
            symbol,
        ])?;
        let now = Utc::now();
        // one spare year so the oldest requested period is never cut off
        let years = i64::try_from(self.years + 1).unwrap_or(5);
        let start = now - Duration::days(366 * years);

        let response = self
            .client
            .get(url)
            .query(&[
                ("symbol", symbol.to_string()),
                ("type", INCOME_SERIES.join(",")),
                ("period1", start.timestamp().to_string()),
                ("period2", now.timestamp().to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AdvisorError::RateLimitExceeded {
                provider: "Yahoo Finance".to_string(),
            });
        }
        if !status.is_success() {
            return Err(AdvisorError::YahooFinanceError(format!(
                "HTTP {status} from fundamentals timeseries"
            )));
        }

        let parsed: TimeseriesResponse = response.json().await?;
        if let Some(error) = parsed.timeseries.error {
            return Err(AdvisorError::YahooFinanceError(error.message()));
        }

        let mut statement = income_from_timeseries(parsed.timeseries.result.unwrap_or_default())?;
        statement.periods.truncate(self.years);
        Ok(statement)
    }

    /// Latest close from the quote API
    #[instrument(skip(self))]
    pub async fn get_latest_price(&self, symbol: &str) -> Result<f64> {
        let provider = yahoo::YahooConnector::new()
            .map_err(|e| AdvisorError::YahooFinanceError(e.to_string()))?;

        let response = provider
            .get_latest_quotes(symbol, "1d")
            .await
            .map_err(|e| AdvisorError::YahooFinanceError(e.to_string()))?;

        let quote = response
            .last_quote()
            .map_err(|e| AdvisorError::YahooFinanceError(e.to_string()))?;

        Ok(quote.close)
    }
}

/// Fold the per-series points into one period per `asOfDate`
fn income_from_timeseries(results: Vec<TimeseriesResult>) -> Result<IncomeStatement> {
    let mut periods: BTreeMap<String, IncomePeriod> = BTreeMap::new();

    for mut result in results {
        for kind in result.meta.kind {
            let Some(raw) = result.series.remove(&kind) else {
                continue;
            };
            // Missing years are reported as null entries
            let points: Vec<Option<TimeseriesPoint>> = serde_json::from_value(raw)?;

            for point in points.into_iter().flatten() {
                let period = periods
                    .entry(point.as_of_date.clone())
                    .or_insert_with(|| IncomePeriod {
                        as_of: point.as_of_date.clone(),
                        ..Default::default()
                    });
                if period.currency.is_none() {
                    period.currency = point.currency_code;
                }

                let value = Some(point.reported_value.raw);
                match kind.as_str() {
                    "annualTotalRevenue" => period.total_revenue = value,
                    "annualGrossProfit" => period.gross_profit = value,
                    "annualOperatingIncome" => period.operating_income = value,
                    "annualEBITDA" => period.ebitda = value,
                    "annualNetIncome" => period.net_income = value,
                    "annualDilutedEPS" => period.diluted_eps = value,
                    _ => {}
                }
            }
        }
    }

    let mut statement = IncomeStatement {
        periods: periods.into_values().collect(),
    };
    statement.sort();
    Ok(statement)
}

#[async_trait]
impl FinancialData for YahooFinanceClient {
    async fn fetch_financials(&self, ticker: &Ticker) -> Result<String> {
        let symbol = ticker.symbol();
        let profile = self.get_profile(symbol).await?;
        let statement = self.get_income_statement(symbol).await?;
        info!(
            "Fetched {} profile and {} income periods",
            symbol,
            statement.periods.len()
        );
        Ok(render_financials(ticker, &profile, &statement))
    }

    async fn latest_price(&self, ticker: &Ticker) -> Result<f64> {
        self.get_latest_price(ticker.symbol()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticker::SymbolNormalizer;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CHART_AAPL: &str = r#"{
        "chart": {
            "result": [{
                "meta": {
                    "currency": "USD",
                    "symbol": "AAPL",
                    "exchangeName": "NMS",
                    "fullExchangeName": "NasdaqGS",
                    "instrumentType": "EQUITY",
                    "regularMarketPrice": 189.84,
                    "fiftyTwoWeekHigh": 199.62,
                    "fiftyTwoWeekLow": 164.08,
                    "regularMarketVolume": 52000000,
                    "longName": "Apple Inc.",
                    "shortName": "Apple Inc.",
                    "chartPreviousClose": 187.0
                },
                "timestamp": [1700000000],
                "indicators": {}
            }],
            "error": null
        }
    }"#;

    const TIMESERIES_AAPL: &str = r#"{
        "timeseries": {
            "result": [
                {
                    "meta": { "symbol": ["AAPL"], "type": ["annualTotalRevenue"] },
                    "timestamp": [1664496000, 1696032000],
                    "annualTotalRevenue": [
                        { "asOfDate": "2022-09-30", "periodType": "12M", "currencyCode": "USD",
                          "reportedValue": { "raw": 394328000000.0, "fmt": "394.33B" } },
                        { "asOfDate": "2023-09-30", "periodType": "12M", "currencyCode": "USD",
                          "reportedValue": { "raw": 383285000000.0, "fmt": "383.29B" } }
                    ]
                },
                {
                    "meta": { "symbol": ["AAPL"], "type": ["annualNetIncome"] },
                    "timestamp": [1664496000, 1696032000],
                    "annualNetIncome": [
                        null,
                        { "asOfDate": "2023-09-30", "periodType": "12M", "currencyCode": "USD",
                          "reportedValue": { "raw": 96995000000.0, "fmt": "97.00B" } }
                    ]
                },
                {
                    "meta": { "symbol": ["AAPL"], "type": ["annualEBITDA"] }
                }
            ],
            "error": null
        }
    }"#;

    fn client_for(server: &MockServer) -> YahooFinanceClient {
        YahooFinanceClient::new().unwrap().with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_get_profile_decodes_chart_meta() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .and(query_param("range", "1d"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CHART_AAPL))
            .expect(1)
            .mount(&server)
            .await;

        let profile = client_for(&server).get_profile("AAPL").await.unwrap();
        assert_eq!(profile.name.as_deref(), Some("Apple Inc."));
        assert_eq!(profile.exchange.as_deref(), Some("NasdaqGS"));
        assert_eq!(profile.market_price, Some(189.84));
        assert_eq!(profile.previous_close, Some(187.0));
        assert_eq!(profile.volume, Some(52_000_000));
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_data_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/NOPE"))
            .respond_with(ResponseTemplate::new(404).set_body_string(
                r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
            ))
            .mount(&server)
            .await;

        let err = client_for(&server).get_profile("NOPE").await.unwrap_err();
        match err {
            AdvisorError::DataUnavailable { symbol, reason } => {
                assert_eq!(symbol, "NOPE");
                assert!(reason.contains("delisted"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = client_for(&server).get_profile("AAPL").await.unwrap_err();
        assert!(matches!(err, AdvisorError::RateLimitExceeded { .. }));
    }

    #[tokio::test]
    async fn test_get_income_statement_groups_by_period() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/fundamentals-timeseries/v1/finance/timeseries/AAPL"))
            .and(query_param("symbol", "AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_string(TIMESERIES_AAPL))
            .expect(1)
            .mount(&server)
            .await;

        let statement = client_for(&server)
            .get_income_statement("AAPL")
            .await
            .unwrap();

        assert_eq!(statement.periods.len(), 2);
        let latest = &statement.periods[0];
        assert_eq!(latest.as_of, "2023-09-30");
        assert_eq!(latest.total_revenue, Some(383_285_000_000.0));
        assert_eq!(latest.net_income, Some(96_995_000_000.0));
        assert_eq!(latest.currency.as_deref(), Some("USD"));
        assert_eq!(statement.periods[1].net_income, None);
    }

    #[tokio::test]
    async fn test_fetch_financials_renders_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CHART_AAPL))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ws/fundamentals-timeseries/v1/finance/timeseries/AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_string(TIMESERIES_AAPL))
            .mount(&server)
            .await;

        let ticker = SymbolNormalizer::default().normalize("aapl").unwrap();
        let text = client_for(&server)
            .fetch_financials(&ticker)
            .await
            .unwrap();

        assert!(text.starts_with("## Financial data for AAPL"));
        assert!(text.contains("- Name: Apple Inc."));
        assert!(text.contains("#### Period ending 2023-09-30"));
        assert!(text.contains("- Total revenue: USD 394.33B"));
    }

    #[tokio::test]
    async fn test_malformed_series_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/fundamentals-timeseries/v1/finance/timeseries/AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"timeseries":{"result":[{"meta":{"type":["annualTotalRevenue"]},
                    "annualTotalRevenue":[{"asOfDate":"2023-09-30","reportedValue":{"raw":"garbage"}}]}],
                    "error":null}}"#,
            ))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_income_statement("AAPL")
            .await
            .unwrap_err();
        assert!(matches!(err, AdvisorError::JsonError(_)));
    }

    #[tokio::test]
    async fn test_symbol_is_encoded_into_one_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/FOO%3FX%23Y"))
            .and(query_param("range", "1d"))
            .and(query_param("interval", "1d"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CHART_AAPL))
            .expect(1)
            .mount(&server)
            .await;

        let profile = client_for(&server).get_profile("FOO?X#Y").await.unwrap();
        assert_eq!(profile.symbol, "AAPL");
    }

    #[test]
    fn test_huge_year_count_is_clamped() {
        let settings = DataSettings {
            income_statement_years: usize::MAX,
            ..Default::default()
        };
        let client = YahooFinanceClient::from_settings(&settings).unwrap();
        assert_eq!(client.years, MAX_INCOME_STATEMENT_YEARS);
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_get_latest_price() {
        let client = YahooFinanceClient::new().unwrap();
        let price = client.get_latest_price("AAPL").await.unwrap();
        assert!(price > 0.0);
    }
}
