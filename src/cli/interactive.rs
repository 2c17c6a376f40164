use super::ui;
use crate::core::conversion::FetchDisposition;
use crate::core::currency::CurrencyCode;
use crate::core::session::ConverterSession;
use anyhow::{Result, anyhow, bail};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

const HELP: &str = "\
Commands:
  amount <value>   set the amount to convert
  from <CODE>      set the base currency
  to <CODE>        set the target currency
  swap             exchange base and target
  fav              toggle the current pair as favorite
  refresh          fetch rates again
  show             print the current conversion and trend
  currencies       list supported currencies
  help             show this help
  quit             exit";

#[derive(Debug, PartialEq)]
pub enum Command {
    Amount(String),
    From(CurrencyCode),
    To(CurrencyCode),
    Swap,
    Favorite,
    Refresh,
    Show,
    Currencies,
    Help,
    Quit,
    Empty,
}

pub fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    let (name, arg) = match line.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (line, ""),
    };

    let command = match name.to_lowercase().as_str() {
        "" => Command::Empty,
        "amount" | "a" => Command::Amount(arg.to_string()),
        "from" | "f" => Command::From(required(name, arg)?.parse()?),
        "to" | "t" => Command::To(required(name, arg)?.parse()?),
        "swap" | "s" => Command::Swap,
        "fav" => Command::Favorite,
        "refresh" | "r" => Command::Refresh,
        "show" => Command::Show,
        "currencies" | "list" => Command::Currencies,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("Unknown command: {other}. Type 'help' for a list of commands."),
    };
    Ok(command)
}

fn required<'a>(name: &str, arg: &'a str) -> Result<&'a str> {
    if arg.is_empty() {
        Err(anyhow!("Missing currency code for '{name}'"))
    } else {
        Ok(arg)
    }
}

/// Tracks whether completions since the last reprint changed anything.
///
/// The reprint waits until nothing is in flight, but a stale completion can be
/// the last to arrive after an applied one, so the pending flag outlives it.
#[derive(Debug, Default)]
struct PendingRender {
    pending: bool,
}

impl PendingRender {
    /// Records a completion and returns whether the state should be printed now.
    fn record(&mut self, disposition: FetchDisposition, in_flight: usize) -> bool {
        if disposition != FetchDisposition::Stale {
            self.pending = true;
        }
        if self.pending && in_flight == 0 {
            self.pending = false;
            return true;
        }
        false
    }
}

fn print_state(session: &ConverterSession) {
    println!("{}", session.state().view().display_as_table());
}

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

/// Runs the interactive prompt until `quit` or end of input.
pub async fn run(mut session: ConverterSession) -> Result<()> {
    println!("{}", ui::style_text("Currency Exchange", ui::StyleType::Title));
    println!("{}", ui::style_text("Type 'help' for commands.", ui::StyleType::Subtle));

    session.start();
    print_state(&session);
    prompt()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut render = PendingRender::default();
    loop {
        tokio::select! {
            Some(disposition) = session.next_completion(), if session.in_flight() > 0 => {
                debug!(?disposition, "Fetch completed");
                if render.record(disposition, session.in_flight()) {
                    println!();
                    print_state(&session);
                    prompt()?;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    // Input closed; show where outstanding fetches land
                    if session.in_flight() > 0 {
                        session.settle().await;
                        println!();
                        print_state(&session);
                    }
                    break;
                };
                match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => handle(&mut session, command),
                    Err(e) => println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error)),
                }
                prompt()?;
            }
        }
    }

    Ok(())
}

fn handle(session: &mut ConverterSession, command: Command) {
    match command {
        Command::Amount(raw) => {
            session.set_amount(raw);
            print_state(session);
        }
        Command::From(code) => {
            session.set_base_currency(code);
            print_state(session);
        }
        Command::To(code) => {
            session.set_target_currency(code);
            print_state(session);
        }
        Command::Swap => {
            session.swap();
            print_state(session);
        }
        Command::Favorite => {
            let saved = session.toggle_favorite();
            println!("{}", if saved { "Saved" } else { "Removed from favorites" });
        }
        Command::Refresh => {
            session.refresh();
            print_state(session);
        }
        Command::Show => {
            let view = session.state().view();
            println!("{}", view.display_as_table());
            ui::print_separator();
            println!("{}", view.display_trend());
        }
        Command::Currencies => {
            let codes: Vec<String> = CurrencyCode::all().map(|c| c.to_string()).collect();
            println!("{}", codes.join(" "));
        }
        Command::Help => println!("{HELP}"),
        Command::Quit | Command::Empty => {}
    }
}
