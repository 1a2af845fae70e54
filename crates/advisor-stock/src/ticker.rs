//! Ticker symbols and the symbol normalizer
//!
//! Users type either a symbol (`AAPL`, `RELIANCE.NS`) or a company name
//! (`tata motors`). The normalizer turns that into a [`Ticker`]: exchange
//! qualified symbols pass through, known Indian company names get the NSE
//! `.NS` suffix, everything else is forwarded uppercased. Unknown input is
//! never rejected here; a bad symbol surfaces later as a data-fetch error.

use crate::error::{AdvisorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Suffix Yahoo Finance uses for the National Stock Exchange of India
pub const NSE_SUFFIX: &str = ".NS";

/// Suffix Yahoo Finance uses for the Bombay Stock Exchange
pub const BSE_SUFFIX: &str = ".BO";

/// Built-in Indian company names and their NSE symbols
///
/// Keys are matched case-insensitively with spaces removed, so
/// `"Tata Motors"`, `"TATA MOTORS"` and `"tatamotors"` all hit the same entry.
const DEFAULT_INDIAN_SYMBOLS: &[(&str, &str)] = &[
    ("ADANI ENTERPRISES", "ADANIENT"),
    ("ADANI PORTS", "ADANIPORTS"),
    ("AIRTEL", "BHARTIARTL"),
    ("ASIAN PAINTS", "ASIANPAINT"),
    ("AXIS BANK", "AXISBANK"),
    ("BAJAJ FINANCE", "BAJFINANCE"),
    ("BHARTI AIRTEL", "BHARTIARTL"),
    ("COAL INDIA", "COALINDIA"),
    ("HCL TECHNOLOGIES", "HCLTECH"),
    ("HDFC BANK", "HDFCBANK"),
    ("HINDUSTAN UNILEVER", "HINDUNILVR"),
    ("ICICI BANK", "ICICIBANK"),
    ("INFOSYS", "INFY"),
    ("ITC", "ITC"),
    ("KOTAK MAHINDRA BANK", "KOTAKBANK"),
    ("LARSEN AND TOUBRO", "LT"),
    ("L&T", "LT"),
    ("MAHINDRA AND MAHINDRA", "M&M"),
    ("MARUTI SUZUKI", "MARUTI"),
    ("NESTLE INDIA", "NESTLEIND"),
    ("NTPC", "NTPC"),
    ("ONGC", "ONGC"),
    ("POWER GRID", "POWERGRID"),
    ("RELIANCE", "RELIANCE"),
    ("RELIANCE INDUSTRIES", "RELIANCE"),
    ("SBI", "SBIN"),
    ("STATE BANK OF INDIA", "SBIN"),
    ("SUN PHARMA", "SUNPHARMA"),
    ("TATA CONSULTANCY SERVICES", "TCS"),
    ("TATA MOTORS", "TATAMOTORS"),
    ("TATA STEEL", "TATASTEEL"),
    ("TCS", "TCS"),
    ("TECH MAHINDRA", "TECHM"),
    ("TITAN", "TITAN"),
    ("ULTRATECH CEMENT", "ULTRACEMCO"),
    ("WIPRO", "WIPRO"),
    ("ZOMATO", "ZOMATO"),
];

/// A normalized, exchange-qualified stock symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Ticker {
    symbol: String,
    input: String,
}

impl Ticker {
    fn new(symbol: String, input: &str) -> Self {
        Self {
            symbol,
            input: input.trim().to_string(),
        }
    }

    /// The canonical symbol, e.g. `TATAMOTORS.NS`
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// What the user typed, trimmed
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Exchange suffix including the dot, if any
    pub fn exchange_suffix(&self) -> Option<&str> {
        exchange_suffix(&self.symbol).map(|idx| &self.symbol[idx..])
    }

    /// Whether the symbol is listed on an Indian exchange (NSE or BSE)
    pub fn is_indian(&self) -> bool {
        matches!(self.exchange_suffix(), Some(NSE_SUFFIX | BSE_SUFFIX))
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        &self.symbol
    }
}

/// Symbol table configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolSettings {
    /// Extra (or overriding) Indian company name → NSE symbol entries
    pub indian: BTreeMap<String, String>,

    /// Whether to start from the built-in table
    pub include_defaults: bool,
}

impl Default for SymbolSettings {
    fn default() -> Self {
        Self {
            indian: BTreeMap::new(),
            include_defaults: true,
        }
    }
}

/// Maps free-form input to a [`Ticker`]
#[derive(Debug, Clone)]
pub struct SymbolNormalizer {
    /// Compacted name or base symbol → exchange-qualified symbol
    indian: BTreeMap<String, String>,
}

impl Default for SymbolNormalizer {
    fn default() -> Self {
        Self::from_settings(&SymbolSettings::default())
    }
}

impl SymbolNormalizer {
    /// Build a normalizer from configuration
    ///
    /// Every mapped base symbol also maps to itself, so `TATAMOTORS` resolves
    /// the same way as `TATA MOTORS`. Values that already carry an exchange
    /// suffix (`FOO.BO`) are kept as they are; bare values get `.NS`.
    pub fn from_settings(settings: &SymbolSettings) -> Self {
        let defaults = DEFAULT_INDIAN_SYMBOLS
            .iter()
            .filter(|_| settings.include_defaults)
            .map(|(name, symbol)| (*name, *symbol));
        let custom = settings
            .indian
            .iter()
            .map(|(name, symbol)| (name.as_str(), symbol.as_str()));

        let mut indian = BTreeMap::new();
        for (name, symbol) in defaults.chain(custom) {
            let symbol = compact(symbol);
            let (base, qualified) = match exchange_suffix(&symbol) {
                Some(idx) => (symbol[..idx].to_string(), symbol.clone()),
                None => {
                    let base = symbol.strip_suffix(NSE_SUFFIX).unwrap_or(symbol.as_str());
                    (base.to_string(), format!("{base}{NSE_SUFFIX}"))
                }
            };
            if base.is_empty() {
                continue;
            }
            indian.insert(base, qualified.clone());
            indian.insert(compact(name), qualified);
        }

        Self { indian }
    }

    /// Number of names the Indian table recognizes
    pub fn len(&self) -> usize {
        self.indian.len()
    }

    /// Whether the Indian table is empty
    pub fn is_empty(&self) -> bool {
        self.indian.is_empty()
    }

    /// Normalize user input into a ticker
    ///
    /// Only empty input is an error.
    pub fn normalize(&self, input: &str) -> Result<Ticker> {
        let cleaned = input
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();

        if cleaned.is_empty() {
            return Err(AdvisorError::InvalidSymbol(
                "no symbol or company name given".to_string(),
            ));
        }

        // Already exchange-qualified: symbols never contain spaces
        if exchange_suffix(&cleaned).is_some() {
            return Ok(Ticker::new(compact(&cleaned), input));
        }

        if let Some(symbol) = self.indian.get(&compact(&cleaned)) {
            return Ok(Ticker::new(symbol.clone(), input));
        }

        Ok(Ticker::new(cleaned, input))
    }
}

/// Uppercase and strip all whitespace
fn compact(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Byte index of a trailing exchange suffix (`.` followed by 1-4 letters)
fn exchange_suffix(symbol: &str) -> Option<usize> {
    let idx = symbol.rfind('.')?;
    let (head, tail) = symbol.split_at(idx);
    let letters = &tail[1..];

    let qualified = !head.trim().is_empty()
        && (1..=4).contains(&letters.len())
        && letters.chars().all(|c| c.is_ascii_alphabetic());
    qualified.then_some(idx)
}
