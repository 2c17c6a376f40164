use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::currency::CurrencyCode;
use crate::core::rates::{RateSource, RateTable};

pub const DEFAULT_BASE_URL: &str = "https://api.exchangerate.host";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

// ExchangeRateHostProvider implementation for RateSource
pub struct ExchangeRateHostProvider {
    base_url: String,
    access_key: Option<String>,
    client: reqwest::Client,
}

impl ExchangeRateHostProvider {
    pub fn new(base_url: &str, access_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("xrate/1.0")
            .timeout(timeout)
            .build()?;
        Ok(ExchangeRateHostProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_key,
            client,
        })
    }

    fn latest_request(&self, base: &CurrencyCode) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(format!("{}/latest", self.base_url))
            .query(&[("base", base.as_str())]);
        match &self.access_key {
            Some(key) => request.query(&[("access_key", key.as_str())]),
            None => request,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    rates: Option<HashMap<String, f64>>,
    success: Option<bool>,
    error: Option<Value>,
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Pulls a readable message out of the API's error payload.
fn describe_error(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("info")
            .or_else(|| map.get("message"))
            .or_else(|| map.get("type"))
            .and_then(Value::as_str)
            .map_or_else(|| value.to_string(), str::to_string),
        other => other.to_string(),
    }
}

#[async_trait]
impl RateSource for ExchangeRateHostProvider {
    #[instrument(
        name = "ExchangeRateHostFetch",
        skip(self),
        fields(base = %base)
    )]
    async fn fetch_rates(&self, base: &CurrencyCode) -> Result<RateTable> {
        debug!("Requesting latest rates from {}/latest?base={}", self.base_url, base);

        // The URL carries the access key, so it is stripped from transport errors
        let response = self
            .latest_request(base)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for base: {}", e.without_url(), base))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for base: {}",
                response.status(),
                base
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response for {}: {}", base, e.without_url()))?;

        let data: LatestRatesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", base, e))?;

        if data.success != Some(true) {
            if let Some(error) = data.error.as_ref().filter(|e| is_truthy(e)) {
                return Err(anyhow!(
                    "Rate source reported an error for {}: {}",
                    base,
                    describe_error(error)
                ));
            }
        }

        let rates = data
            .rates
            .ok_or_else(|| anyhow!("No rates found for base: {}", base))?;

        Ok(RateTable::new(base.clone(), rates))
    }
}
