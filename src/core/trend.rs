//! Synthetic trend samples for the rate chart.
//!
//! The samples are random jitter around the current rate and exist only to
//! give the chart some texture. They are not historical data and must not
//! be read as a forecast.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::Serialize;

pub const DEFAULT_SAMPLE_COUNT: usize = 12;
pub const DEFAULT_JITTER: f64 = 0.025;

/// One labelled point on the trend chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSample {
    pub label: String,
    pub value: f64,
}

pub struct TrendSampler {
    rng: Box<dyn RngCore + Send>,
    count: usize,
    jitter: f64,
}

impl TrendSampler {
    pub fn new(rng: impl RngCore + Send + 'static) -> Self {
        TrendSampler {
            rng: Box::new(rng),
            count: DEFAULT_SAMPLE_COUNT,
            jitter: DEFAULT_JITTER,
        }
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Reproducible sampler for tests.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Sets the maximum relative deviation; `0.0` yields a flat line.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.abs();
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Produces `count` samples labelled `0h`, `1h`, ... around `center`.
    pub fn sample(&mut self, center: f64) -> Vec<TrendSample> {
        (0..self.count)
            .map(|i| {
                let offset = if self.jitter > 0.0 {
                    self.rng.gen_range(-self.jitter..=self.jitter)
                } else {
                    0.0
                };
                TrendSample {
                    label: format!("{i}h"),
                    value: center * (1.0 + offset),
                }
            })
            .collect()
    }
}

impl Default for TrendSampler {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl std::fmt::Debug for TrendSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrendSampler")
            .field("count", &self.count)
            .field("jitter", &self.jitter)
            .finish_non_exhaustive()
    }
}

/// Percentage change from the first to the last sample.
pub fn change_percent(samples: &[TrendSample]) -> Option<f64> {
    let first = samples.first()?.value;
    let last = samples.last()?.value;
    if first <= 0.0 {
        return None;
    }
    Some((last - first) / first * 100.0)
}
