//! Drives a [`ConversionState`] against a [`RateSource`].
//!
//! Every issued fetch runs as its own task. Completions come back over a
//! channel in whatever order they finish and are handed to the state, which
//! drops anything that is not the latest ticket.
use crate::core::conversion::{ConversionState, FetchDisposition, FetchTicket};
use crate::core::currency::CurrencyCode;
use crate::core::rates::{RateSource, RateTable};
use anyhow::{Result, anyhow};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

type Completion = (FetchTicket, Result<RateTable>);

pub struct ConverterSession {
    state: ConversionState,
    source: Arc<dyn RateSource>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: usize,
}

impl ConverterSession {
    pub fn new(state: ConversionState, source: Arc<dyn RateSource>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        ConverterSession {
            state,
            source,
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn state(&self) -> &ConversionState {
        &self.state
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Issues the initial load.
    pub fn start(&mut self) {
        let ticket = self.state.load();
        self.dispatch(ticket);
    }

    pub fn refresh(&mut self) {
        self.start();
    }

    pub fn set_amount(&mut self, raw: impl Into<String>) {
        self.state.set_amount(raw);
    }

    pub fn set_base_currency(&mut self, code: CurrencyCode) {
        if let Some(ticket) = self.state.set_base_currency(code) {
            self.dispatch(ticket);
        }
    }

    pub fn set_target_currency(&mut self, code: CurrencyCode) {
        self.state.set_target_currency(code);
    }

    pub fn swap(&mut self) {
        if let Some(ticket) = self.state.swap() {
            self.dispatch(ticket);
        }
    }

    pub fn toggle_favorite(&mut self) -> bool {
        self.state.toggle_favorite()
    }

    fn dispatch(&mut self, ticket: FetchTicket) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        self.in_flight += 1;
        debug!(id = ticket.id, base = %ticket.base, "Spawning rate fetch");
        tokio::spawn(async move {
            // A panicking source must still report back, or in_flight never drains
            let base = ticket.base.clone();
            let outcome = match tokio::spawn(async move { source.fetch_rates(&base).await }).await
            {
                Ok(outcome) => outcome,
                Err(e) => Err(anyhow!("Rate fetch task failed: {}", e)),
            };
            // The receiver lives as long as the session; a send error only
            // means the session is gone.
            let _ = tx.send((ticket, outcome));
        });
    }

    /// Waits for the next fetch to finish and applies it.
    ///
    /// Returns `None` when no fetch is outstanding.
    pub async fn next_completion(&mut self) -> Option<FetchDisposition> {
        if self.in_flight == 0 {
            return None;
        }
        let (ticket, outcome) = self.rx.recv().await?;
        self.in_flight -= 1;
        Some(self.state.apply_fetch(ticket, outcome))
    }

    /// Waits for every outstanding fetch.
    pub async fn settle(&mut self) {
        while self.next_completion().await.is_some() {}
    }
}
