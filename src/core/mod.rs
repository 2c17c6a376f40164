//! Core business logic abstractions

pub mod config;
pub mod conversion;
pub mod currency;
pub mod log;
pub mod rates;
pub mod session;
pub mod trend;

// Re-export main types for cleaner imports
pub use conversion::{ConversionState, ConversionView, FetchDisposition, FetchTicket};
pub use currency::CurrencyCode;
pub use rates::{RateSource, RateTable};
pub use session::ConverterSession;
pub use trend::{TrendSample, TrendSampler};
