//! Exchange rate tables and the source they are fetched from

use crate::core::currency::CurrencyCode;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Rates for one base currency from a single fetch.
///
/// Every stored rate is finite and positive; anything else received from
/// the wire is dropped when the table is built.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    base: CurrencyCode,
    rates: HashMap<String, f64>,
}

impl RateTable {
    pub fn new(base: CurrencyCode, rates: HashMap<String, f64>) -> Self {
        let rates = rates
            .into_iter()
            .filter(|(_, rate)| rate.is_finite() && *rate > 0.0)
            .collect();
        RateTable { base, rates }
    }

    pub fn base(&self) -> &CurrencyCode {
        &self.base
    }

    /// Value of one unit of the base currency in `code`.
    pub fn get(&self, code: &CurrencyCode) -> Option<f64> {
        self.rates.get(code.as_str()).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rates(&self, base: &CurrencyCode) -> Result<RateTable>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_table_drops_invalid_rates() {
        let usd: CurrencyCode = "USD".parse().unwrap();
        let table = RateTable::new(
            usd.clone(),
            HashMap::from([
                ("EUR".to_string(), 0.92),
                ("GBP".to_string(), 0.0),
                ("JPY".to_string(), -1.0),
                ("CHF".to_string(), f64::NAN),
                ("XAU".to_string(), 0.0005),
            ]),
        );

        assert_eq!(table.base(), &usd);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&"EUR".parse().unwrap()), Some(0.92));
        assert_eq!(table.get(&"GBP".parse().unwrap()), None);
        assert_eq!(table.get(&"CHF".parse().unwrap()), None);
    }
}
