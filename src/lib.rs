pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::AppConfig;
use crate::core::conversion::ConversionState;
use crate::core::currency::CurrencyCode;
use crate::core::rates::RateSource;
use crate::core::session::ConverterSession;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// Overrides supplied on the command line.
#[derive(Debug, Default, Clone)]
pub struct ConvertOptions {
    pub amount: Option<String>,
    pub from: Option<CurrencyCode>,
    pub to: Option<CurrencyCode>,
}

pub enum AppCommand {
    Convert { options: ConvertOptions, json: bool },
    Interactive(ConvertOptions),
    Currencies,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Currency converter starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Convert { options, json } => {
            let session = build_session(&config, options)?;
            cli::convert::run(session, json).await
        }
        AppCommand::Interactive(options) => {
            let session = build_session(&config, options)?;
            cli::interactive::run(session).await
        }
        AppCommand::Currencies => {
            for code in CurrencyCode::all() {
                println!("{code}");
            }
            Ok(())
        }
    }
}

/// Wires the configured rate provider to a fresh conversion state.
pub fn build_session(config: &AppConfig, options: ConvertOptions) -> Result<ConverterSession> {
    let provider_config = config.exchangerate_host();
    let source: Arc<dyn RateSource> =
        Arc::new(providers::exchangerate_host::ExchangeRateHostProvider::new(
            &provider_config.base_url,
            provider_config.access_key.clone(),
            provider_config.timeout(),
        )?);

    let state = ConversionState::new(
        options.from.unwrap_or_else(|| config.base_currency.clone()),
        options.to.unwrap_or_else(|| config.target_currency.clone()),
        options.amount.unwrap_or_else(|| config.amount.clone()),
    );
    Ok(ConverterSession::new(state, source))
}
