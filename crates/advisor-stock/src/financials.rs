//! Provider-neutral financial data and its text rendering
//!
//! Both data providers decode into [`CompanyProfile`] and [`IncomeStatement`];
//! the data research stage hands the rendered text to the LLM.

use crate::ticker::Ticker;
use serde::{Deserialize, Serialize};

const CRORE: f64 = 10_000_000.0;
const LAKH: f64 = 100_000.0;

/// Company profile as reported by the data provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub symbol: String,
    pub name: Option<String>,
    pub exchange: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub currency: Option<String>,
    pub instrument_type: Option<String>,
    pub market_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub eps: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub volume: Option<u64>,
    pub description: Option<String>,
}

/// One annual income statement period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomePeriod {
    /// Period end date (YYYY-MM-DD)
    pub as_of: String,
    pub currency: Option<String>,
    pub total_revenue: Option<f64>,
    pub gross_profit: Option<f64>,
    pub operating_income: Option<f64>,
    pub net_income: Option<f64>,
    pub ebitda: Option<f64>,
    pub diluted_eps: Option<f64>,
}

impl IncomePeriod {
    /// Net margin in percent, when revenue is known and non-zero
    pub fn net_margin(&self) -> Option<f64> {
        match (self.net_income, self.total_revenue) {
            (Some(net), Some(revenue)) if revenue != 0.0 => Some(net / revenue * 100.0),
            _ => None,
        }
    }
}

/// Annual income statements, most recent period first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub periods: Vec<IncomePeriod>,
}

impl IncomeStatement {
    /// Sort periods newest first
    pub fn sort(&mut self) {
        self.periods.sort_by(|a, b| b.as_of.cmp(&a.as_of));
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Year-over-year revenue growth of the latest period, in percent
    pub fn revenue_growth(&self) -> Option<f64> {
        let latest = self.periods.first()?.total_revenue?;
        let prior = self.periods.get(1)?.total_revenue?;
        (prior != 0.0).then(|| (latest - prior) / prior.abs() * 100.0)
    }
}

/// Format a monetary amount
///
/// Indian listings use lakh/crore, everything else K/M/B/T.
pub fn format_amount(value: f64, currency: Option<&str>, indian: bool) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();

    let magnitude = if indian {
        if abs >= CRORE {
            format!("{:.2} crore", abs / CRORE)
        } else if abs >= LAKH {
            format!("{:.2} lakh", abs / LAKH)
        } else {
            format!("{abs:.2}")
        }
    } else if abs >= 1_000_000_000_000.0 {
        format!("{:.2}T", abs / 1_000_000_000_000.0)
    } else if abs >= 1_000_000_000.0 {
        format!("{:.2}B", abs / 1_000_000_000.0)
    } else if abs >= 1_000_000.0 {
        format!("{:.2}M", abs / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{:.2}K", abs / 1_000.0)
    } else {
        format!("{abs:.2}")
    };

    match currency {
        Some(code) => format!("{sign}{code} {magnitude}"),
        None => format!("{sign}{magnitude}"),
    }
}

/// Interpret P/E ratio
pub fn interpret_pe(pe: f64) -> &'static str {
    if pe < 0.0 {
        "Negative (company is not profitable)"
    } else if pe < 15.0 {
        "Low (potentially undervalued or slow growth)"
    } else if pe < 25.0 {
        "Moderate (fairly valued)"
    } else if pe < 50.0 {
        "High (potentially overvalued or high growth)"
    } else {
        "Very High (very expensive or very high growth expectations)"
    }
}

/// Render profile and income statement as Markdown for the LLM
pub fn render_financials(
    ticker: &Ticker,
    profile: &CompanyProfile,
    statement: &IncomeStatement,
) -> String {
    let indian = ticker.is_indian();
    let currency = profile.currency.as_deref();
    let money = |v: f64| format_amount(v, currency, indian);

    let mut out = format!("## Financial data for {ticker}\n\n### Company profile\n");

    let mut line = |label: &str, value: Option<String>| {
        if let Some(value) = value {
            out.push_str(&format!("- {label}: {value}\n"));
        }
    };
    line("Name", profile.name.clone());
    line("Exchange", profile.exchange.clone());
    line("Sector", profile.sector.clone());
    line("Industry", profile.industry.clone());
    line("Instrument type", profile.instrument_type.clone());
    line("Currency", profile.currency.clone());
    line(
        "Last price",
        profile.market_price.map(|p| format!("{p:.2}")),
    );
    line(
        "Previous close",
        profile.previous_close.map(|p| format!("{p:.2}")),
    );
    line("Market cap", profile.market_cap.map(money));
    line(
        "P/E ratio",
        profile
            .pe_ratio
            .map(|pe| format!("{pe:.2} ({})", interpret_pe(pe))),
    );
    line("EPS", profile.eps.map(|eps| format!("{eps:.2}")));
    line(
        "Dividend yield",
        profile.dividend_yield.map(|y| format!("{:.2}%", y * 100.0)),
    );
    line(
        "52-week range",
        match (profile.fifty_two_week_low, profile.fifty_two_week_high) {
            (Some(low), Some(high)) => Some(format!("{low:.2} - {high:.2}")),
            _ => None,
        },
    );
    line("Volume", profile.volume.map(|v| v.to_string()));

    if let Some(description) = &profile.description {
        out.push_str(&format!("\n{description}\n"));
    }

    out.push_str("\n### Annual income statement\n");
    if statement.is_empty() {
        out.push_str("No income statement data was returned.\n");
        return out;
    }

    for period in &statement.periods {
        let money = |v: f64| format_amount(v, period.currency.as_deref().or(currency), indian);
        out.push_str(&format!("\n#### Period ending {}\n", period.as_of));

        let items = [
            ("Total revenue", period.total_revenue.map(money)),
            ("Gross profit", period.gross_profit.map(money)),
            ("Operating income", period.operating_income.map(money)),
            ("EBITDA", period.ebitda.map(money)),
            ("Net income", period.net_income.map(money)),
            ("Diluted EPS", period.diluted_eps.map(|eps| format!("{eps:.2}"))),
            ("Net margin", period.net_margin().map(|m| format!("{m:.1}%"))),
        ];
        for (label, value) in items {
            if let Some(value) = value {
                out.push_str(&format!("- {label}: {value}\n"));
            }
        }
    }

    if let Some(growth) = statement.revenue_growth() {
        out.push_str(&format!(
            "\nRevenue growth in the latest year: {growth:+.1}%\n"
        ));
    }

    out
}
