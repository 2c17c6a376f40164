use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use xrate::core::CurrencyCode;
use xrate::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct PairArgs {
    /// Currency the amount is entered in
    #[arg(short, long)]
    from: Option<CurrencyCode>,

    /// Currency to convert to
    #[arg(short, long)]
    to: Option<CurrencyCode>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Convert an amount once and print the result
    Convert {
        /// Amount to convert
        amount: Option<String>,

        #[command(flatten)]
        pair: PairArgs,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start an interactive converter prompt
    Interactive {
        /// Initial amount
        #[arg(short, long)]
        amount: Option<String>,

        #[command(flatten)]
        pair: PairArgs,
    },
    /// List supported currencies
    Currencies,
}

impl From<Commands> for xrate::AppCommand {
    fn from(cmd: Commands) -> xrate::AppCommand {
        match cmd {
            Commands::Convert { amount, pair, json } => xrate::AppCommand::Convert {
                options: xrate::ConvertOptions {
                    amount,
                    from: pair.from,
                    to: pair.to,
                },
                json,
            },
            Commands::Interactive { amount, pair } => {
                xrate::AppCommand::Interactive(xrate::ConvertOptions {
                    amount,
                    from: pair.from,
                    to: pair.to,
                })
            }
            Commands::Currencies => xrate::AppCommand::Currencies,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => xrate::cli::setup::setup(),
        Some(cmd) => xrate::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
