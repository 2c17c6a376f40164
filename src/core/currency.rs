//! Currency codes supported by the converter

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Currencies offered for selection, in display order.
pub const SUPPORTED_CURRENCIES: [&str; 15] = [
    "USD", "EUR", "GBP", "JPY", "CHF", "CAD", "AUD", "NZD", "INR", "MXN", "SGD", "HKD", "CNY",
    "SEK", "NOK",
];

/// A validated currency code from [`SUPPORTED_CURRENCIES`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn default_base() -> Self {
        CurrencyCode("USD".to_string())
    }

    pub fn default_target() -> Self {
        CurrencyCode("EUR".to_string())
    }

    /// All supported codes, in display order.
    pub fn all() -> impl Iterator<Item = CurrencyCode> {
        SUPPORTED_CURRENCIES
            .iter()
            .map(|code| CurrencyCode(code.to_string()))
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_uppercase();
        if SUPPORTED_CURRENCIES.contains(&code.as_str()) {
            Ok(CurrencyCode(code))
        } else {
            Err(anyhow!("Unsupported currency: {}", s.trim()))
        }
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}
