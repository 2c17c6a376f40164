//! Conversion state: selected currencies, the raw amount, the latest rate
//! table and everything derived from them.
//!
//! Fetching is not performed here. Operations that need fresh rates return a
//! [`FetchTicket`]; whoever performs the fetch hands the outcome back through
//! [`ConversionState::apply_fetch`], which only accepts the latest ticket.
use crate::core::currency::CurrencyCode;
use crate::core::rates::RateTable;
use crate::core::trend::{self, TrendSample, TrendSampler};
use anyhow::Result;
use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, info, warn};

pub const FETCH_ERROR_MESSAGE: &str = "Unable to fetch rates. Please try again.";
const PLACEHOLDER_AMOUNT: &str = "0.00";
const PLACEHOLDER_RATE: &str = "--";

/// Identifies one issued fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub id: u64,
    pub base: CurrencyCode,
}

/// What happened to a completed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDisposition {
    Applied,
    Failed,
    /// A newer fetch was issued since; the outcome was dropped.
    Stale,
}

/// Snapshot of everything the presentation layer displays.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionView {
    pub base: String,
    pub target: String,
    pub amount: String,
    pub converted_amount: String,
    pub exchange_rate: String,
    pub change_percent: Option<f64>,
    pub loading: bool,
    pub error: String,
    pub last_updated_label: String,
    pub is_favorite: bool,
    pub trend_samples: Vec<TrendSample>,
}

#[derive(Debug)]
pub struct ConversionState {
    amount: String,
    base: CurrencyCode,
    target: CurrencyCode,
    rates: Option<RateTable>,
    loading: bool,
    error: Option<String>,
    last_updated: Option<DateTime<Local>>,
    trend_samples: Vec<TrendSample>,
    sampler: TrendSampler,
    is_favorite: bool,
    latest_ticket: u64,
}

impl ConversionState {
    pub fn new(base: CurrencyCode, target: CurrencyCode, amount: impl Into<String>) -> Self {
        Self::with_sampler(base, target, amount, TrendSampler::from_entropy())
    }

    pub fn with_sampler(
        base: CurrencyCode,
        target: CurrencyCode,
        amount: impl Into<String>,
        sampler: TrendSampler,
    ) -> Self {
        ConversionState {
            amount: amount.into(),
            base,
            target,
            rates: None,
            loading: false,
            error: None,
            last_updated: None,
            trend_samples: Vec::new(),
            sampler,
            is_favorite: false,
            latest_ticket: 0,
        }
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn base(&self) -> &CurrencyCode {
        &self.base
    }

    pub fn target(&self) -> &CurrencyCode {
        &self.target
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn rate_table(&self) -> Option<&RateTable> {
        self.rates.as_ref()
    }

    pub fn trend_samples(&self) -> &[TrendSample] {
        &self.trend_samples
    }

    pub fn is_favorite(&self) -> bool {
        self.is_favorite
    }

    /// Local wall-clock time of the last applied table, as `HH:MM:SS`.
    pub fn last_updated_label(&self) -> Option<String> {
        self.last_updated.map(|ts| ts.format("%H:%M:%S").to_string())
    }

    /// Stores the input verbatim. Validation happens at conversion time.
    pub fn set_amount(&mut self, raw: impl Into<String>) {
        self.amount = raw.into();
    }

    pub fn set_base_currency(&mut self, code: CurrencyCode) -> Option<FetchTicket> {
        if code == self.base {
            return None;
        }
        self.base = code;
        Some(self.issue_fetch())
    }

    /// Rates are keyed by base, so a new target only needs fresh samples.
    pub fn set_target_currency(&mut self, code: CurrencyCode) {
        if code == self.target {
            return;
        }
        self.target = code;
        self.regenerate_samples();
    }

    pub fn swap(&mut self) -> Option<FetchTicket> {
        if self.base == self.target {
            return None;
        }
        std::mem::swap(&mut self.base, &mut self.target);
        Some(self.issue_fetch())
    }

    /// Issues a fetch for the current base unconditionally.
    pub fn load(&mut self) -> FetchTicket {
        self.issue_fetch()
    }

    pub fn toggle_favorite(&mut self) -> bool {
        self.is_favorite = !self.is_favorite;
        self.is_favorite
    }

    fn issue_fetch(&mut self) -> FetchTicket {
        self.latest_ticket += 1;
        self.loading = true;
        self.error = None;
        debug!(id = self.latest_ticket, base = %self.base, "Issued rate fetch");
        FetchTicket {
            id: self.latest_ticket,
            base: self.base.clone(),
        }
    }

    pub fn apply_fetch(
        &mut self,
        ticket: FetchTicket,
        outcome: Result<RateTable>,
    ) -> FetchDisposition {
        if ticket.id != self.latest_ticket || ticket.base != self.base {
            debug!(
                id = ticket.id,
                base = %ticket.base,
                latest = self.latest_ticket,
                "Discarding stale rate fetch"
            );
            return FetchDisposition::Stale;
        }

        self.loading = false;
        match outcome {
            Ok(table) => {
                info!(base = %table.base(), rates = table.len(), "Applied rate table");
                self.rates = Some(table);
                self.last_updated = Some(Local::now());
                self.regenerate_samples();
                FetchDisposition::Applied
            }
            Err(e) => {
                // Previous table stays in place.
                warn!(base = %ticket.base, error = %e, "Rate fetch failed");
                self.error = Some(FETCH_ERROR_MESSAGE.to_string());
                FetchDisposition::Failed
            }
        }
    }

    fn target_rate(&self) -> Option<f64> {
        self.rates.as_ref().and_then(|t| t.get(&self.target))
    }

    fn regenerate_samples(&mut self) {
        self.trend_samples = match self.target_rate() {
            Some(rate) => self.sampler.sample(rate),
            None => Vec::new(),
        };
    }

    pub fn converted_amount(&self) -> String {
        parse_amount(&self.amount)
            .zip(self.target_rate())
            .map(|(amount, rate)| amount * rate)
            .filter(|converted| converted.is_finite())
            .map_or(PLACEHOLDER_AMOUNT.to_string(), |converted| {
                format!("{converted:.2}")
            })
    }

    pub fn exchange_rate(&self) -> String {
        self.target_rate()
            .map_or(PLACEHOLDER_RATE.to_string(), |rate| format!("{rate:.6}"))
    }

    /// The "24h change" figure, derived from the illustrative trend samples.
    pub fn change_percent(&self) -> Option<f64> {
        trend::change_percent(&self.trend_samples)
    }

    pub fn view(&self) -> ConversionView {
        ConversionView {
            base: self.base.to_string(),
            target: self.target.to_string(),
            amount: self.amount.clone(),
            converted_amount: self.converted_amount(),
            exchange_rate: self.exchange_rate(),
            change_percent: self.change_percent(),
            loading: self.loading,
            error: self.error.clone().unwrap_or_default(),
            last_updated_label: self.last_updated_label().unwrap_or_default(),
            is_favorite: self.is_favorite,
            trend_samples: self.trend_samples.clone(),
        }
    }
}

/// Parses a finite, non-negative amount. Anything else is `None`.
fn parse_amount(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| if v == 0.0 { 0.0 } else { v })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::HashMap;

    fn code(s: &str) -> CurrencyCode {
        s.parse().unwrap()
    }

    fn table(base: &str, rates: &[(&str, f64)]) -> RateTable {
        RateTable::new(
            code(base),
            rates
                .iter()
                .map(|(c, r)| (c.to_string(), *r))
                .collect::<HashMap<_, _>>(),
        )
    }

    fn state(base: &str, target: &str, amount: &str) -> ConversionState {
        ConversionState::with_sampler(code(base), code(target), amount, TrendSampler::seeded(1))
    }

    #[test]
    fn test_end_to_end_usd_to_eur() {
        let mut s = state("USD", "EUR", "1000");
        let ticket = s.load();
        assert!(s.loading());

        let disposition = s.apply_fetch(ticket, Ok(table("USD", &[("EUR", 0.92), ("USD", 1.0)])));

        assert_eq!(disposition, FetchDisposition::Applied);
        assert!(!s.loading());
        assert_eq!(s.converted_amount(), "920.00");
        assert_eq!(s.exchange_rate(), "0.920000");
        assert!(s.last_updated_label().is_some());
        assert_eq!(s.trend_samples().len(), 12);
    }

    #[test]
    fn test_converted_amount_rounds_to_two_places() {
        let mut s = state("USD", "JPY", "12.5");
        let ticket = s.load();
        s.apply_fetch(ticket, Ok(table("USD", &[("JPY", 151.24)])));
        assert_eq!(s.converted_amount(), "1890.50");

        s.set_amount("3");
        assert_eq!(s.converted_amount(), format!("{:.2}", 3.0 * 151.24));
        assert_eq!(s.exchange_rate(), "151.240000");
    }

    #[test]
    fn test_placeholders_before_first_fetch() {
        let s = state("USD", "EUR", "1000");
        assert_eq!(s.converted_amount(), "0.00");
        assert_eq!(s.exchange_rate(), "--");
        assert!(s.trend_samples().is_empty());
        assert_eq!(s.change_percent(), None);
    }

    #[test]
    fn test_placeholders_for_missing_target_rate() {
        let mut s = state("USD", "NOK", "1000");
        let ticket = s.load();
        s.apply_fetch(ticket, Ok(table("USD", &[("EUR", 0.92)])));

        assert_eq!(s.converted_amount(), "0.00");
        assert_eq!(s.exchange_rate(), "--");
        assert!(s.trend_samples().is_empty());
        assert!(s.error().is_none());
    }

    #[test]
    fn test_unparseable_amount_converts_to_zero() {
        let mut s = state("USD", "EUR", "abc");
        let ticket = s.load();
        s.apply_fetch(ticket, Ok(table("USD", &[("EUR", 0.92)])));

        for raw in ["abc", "", "  ", "-5", "NaN", "inf", "12abc"] {
            s.set_amount(raw);
            assert_eq!(s.amount(), raw);
            assert_eq!(s.converted_amount(), "0.00", "amount {raw:?}");
        }

        s.set_amount(" 10 ");
        assert_eq!(s.converted_amount(), "9.20");
    }

    #[test]
    fn test_negative_zero_and_overflow_amounts() {
        let mut s = state("USD", "JPY", "-0");
        let ticket = s.load();
        s.apply_fetch(ticket, Ok(table("USD", &[("JPY", 150.0)])));
        assert_eq!(s.converted_amount(), "0.00");

        s.set_amount("-0.0");
        assert_eq!(s.converted_amount(), "0.00");

        s.set_amount("1e308");
        assert_eq!(s.converted_amount(), "0.00");
    }

    #[test]
    fn test_set_amount_does_not_fetch() {
        let mut s = state("USD", "EUR", "1");
        s.set_amount("250");
        assert!(!s.loading());
        assert_eq!(s.amount(), "250");
    }

    #[test]
    fn test_identity_conversion() {
        let mut s = state("USD", "USD", "42.5");
        let ticket = s.load();
        s.apply_fetch(ticket, Ok(table("USD", &[("USD", 1.0), ("EUR", 0.92)])));
        assert_eq!(s.converted_amount(), "42.50");
        assert_eq!(s.exchange_rate(), "1.000000");
    }

    #[test]
    fn test_set_target_recomputes_without_fetch() {
        let mut s = state("USD", "EUR", "100");
        let ticket = s.load();
        s.apply_fetch(ticket, Ok(table("USD", &[("EUR", 0.92), ("GBP", 0.79)])));
        let before = s.trend_samples().to_vec();

        s.set_target_currency(code("GBP"));

        assert!(!s.loading());
        assert_eq!(s.converted_amount(), "79.00");
        assert_eq!(s.exchange_rate(), "0.790000");
        assert_eq!(s.trend_samples().len(), 12);
        assert_ne!(s.trend_samples(), before.as_slice());
        assert!(s.trend_samples().iter().all(|t| (0.77..=0.81).contains(&t.value)));
    }

    #[test]
    fn test_set_base_issues_fetch_only_on_change() {
        let mut s = state("USD", "EUR", "1");
        assert!(s.set_base_currency(code("USD")).is_none());

        let ticket = s.set_base_currency(code("GBP")).unwrap();
        assert_eq!(ticket.base, code("GBP"));
        assert!(s.loading());
    }

    #[test]
    fn test_swap_twice_restores_pair() {
        let mut s = state("USD", "EUR", "10");
        let initial = s.load();
        s.apply_fetch(initial, Ok(table("USD", &[("EUR", 0.92)])));

        let first = s.swap().unwrap();
        assert_eq!((s.base(), s.target()), (&code("EUR"), &code("USD")));
        assert_eq!(first.base, code("EUR"));
        let first_id = first.id;
        s.apply_fetch(first, Ok(table("EUR", &[("USD", 1.087)])));
        assert_eq!(s.exchange_rate(), "1.087000");

        let second = s.swap().unwrap();
        assert_eq!((s.base(), s.target()), (&code("USD"), &code("EUR")));
        assert_eq!(second.base, code("USD"));
        assert!(second.id > first_id);
        s.apply_fetch(second, Ok(table("USD", &[("EUR", 0.92)])));

        assert_eq!(s.rate_table().unwrap().base(), &code("USD"));
        assert_eq!(s.converted_amount(), "9.20");
    }

    #[test]
    fn test_swap_equal_currencies_is_noop() {
        let mut s = state("EUR", "EUR", "1");
        assert!(s.swap().is_none());
        assert!(!s.loading());
    }

    #[test]
    fn test_late_response_for_earlier_base_is_discarded() {
        let mut s = state("USD", "CHF", "100");
        let a = s.set_base_currency(code("EUR")).unwrap();
        let b = s.set_base_currency(code("GBP")).unwrap();

        assert_eq!(
            s.apply_fetch(b, Ok(table("GBP", &[("CHF", 1.13)]))),
            FetchDisposition::Applied
        );
        assert_eq!(
            s.apply_fetch(a, Ok(table("EUR", &[("CHF", 0.96)]))),
            FetchDisposition::Stale
        );

        assert_eq!(s.rate_table().unwrap().base(), &code("GBP"));
        assert_eq!(s.exchange_rate(), "1.130000");
        assert!(!s.loading());
    }

    #[test]
    fn test_stale_response_does_not_clear_loading() {
        let mut s = state("USD", "EUR", "1");
        let a = s.set_base_currency(code("GBP")).unwrap();
        let _b = s.set_base_currency(code("JPY")).unwrap();

        assert_eq!(s.apply_fetch(a, Err(anyhow!("boom"))), FetchDisposition::Stale);
        assert!(s.loading());
        assert!(s.error().is_none());
    }

    #[test]
    fn test_ticket_for_reselected_base_is_still_stale() {
        let mut s = state("USD", "EUR", "1");
        let a = s.set_base_currency(code("GBP")).unwrap();
        let _b = s.set_base_currency(code("JPY")).unwrap();
        let c = s.set_base_currency(code("GBP")).unwrap();

        assert_eq!(
            s.apply_fetch(a, Ok(table("GBP", &[("EUR", 1.1)]))),
            FetchDisposition::Stale
        );
        assert_eq!(
            s.apply_fetch(c, Ok(table("GBP", &[("EUR", 1.2)]))),
            FetchDisposition::Applied
        );
        assert_eq!(s.exchange_rate(), "1.200000");
    }

    #[test]
    fn test_failure_keeps_previous_rates() {
        let mut s = state("USD", "EUR", "1000");
        let first = s.load();
        s.apply_fetch(first, Ok(table("USD", &[("EUR", 0.92)])));
        let updated = s.last_updated_label();

        let second = s.load();
        assert!(s.error().is_none());
        let disposition = s.apply_fetch(second, Err(anyhow!("connection refused")));

        assert_eq!(disposition, FetchDisposition::Failed);
        assert_eq!(s.error(), Some(FETCH_ERROR_MESSAGE));
        assert!(!s.loading());
        assert_eq!(s.converted_amount(), "920.00");
        assert_eq!(s.last_updated_label(), updated);
    }

    #[test]
    fn test_new_fetch_clears_error() {
        let mut s = state("USD", "EUR", "1");
        let first = s.load();
        s.apply_fetch(first, Err(anyhow!("timeout")));
        assert!(s.error().is_some());

        s.set_base_currency(code("GBP"));
        assert!(s.error().is_none());
        assert!(s.loading());
    }

    #[test]
    fn test_change_percent_follows_samples() {
        let mut s = ConversionState::with_sampler(
            code("USD"),
            code("EUR"),
            "1",
            TrendSampler::seeded(9).with_jitter(0.0),
        );
        let ticket = s.load();
        s.apply_fetch(ticket, Ok(table("USD", &[("EUR", 0.92)])));
        assert_eq!(s.change_percent(), Some(0.0));
    }

    #[test]
    fn test_view_snapshot() {
        let mut s = state("USD", "EUR", "1000");
        assert!(s.toggle_favorite());
        let ticket = s.load();
        s.apply_fetch(ticket, Ok(table("USD", &[("EUR", 0.92)])));

        let view = s.view();
        assert_eq!(view.base, "USD");
        assert_eq!(view.target, "EUR");
        assert_eq!(view.converted_amount, "920.00");
        assert_eq!(view.exchange_rate, "0.920000");
        assert!(!view.loading);
        assert!(view.error.is_empty());
        assert_eq!(view.last_updated_label.len(), 8);
        assert!(view.is_favorite);
        assert_eq!(view.trend_samples.len(), 12);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["converted_amount"], "920.00");
        assert_eq!(json["trend_samples"][0]["label"], "0h");
    }
}
