//! fx-rates CLI - query a daily exchange rate file from the command line
//!
//! ## Example Usage
//!
//! ```bash
//! # Rates published on a date
//! fx-rates --data data/rates.csv rates 2023-01-03
//!
//! # Convert 100 USD to JPY
//! fx-rates --data data/rates.csv convert 2023-01-03 USD JPY 100
//!
//! # Highest and average rate over a period
//! fx-rates --data data/rates.csv highest 2023-01-02 2023-01-06 GBP
//! fx-rates --data data/rates.csv average 2023-01-02 2023-01-06 GBP
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use rust_decimal::Decimal;
use rusty_fxrates::config::ServiceConfig;
use rusty_fxrates::error::{RateError, Result as RateResult};
use rusty_fxrates::parser::parse_date;
use rusty_fxrates::service::RateService;
use std::path::PathBuf;
use std::process;
use std::str::FromStr;

/// fx-rates: daily reference exchange rate queries
#[derive(Parser)]
#[command(name = "fx-rates")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Daily reference exchange rate queries", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (default: ~/.fx-rates/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Rate CSV file, overrides `default_dataset` from the config
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every rate published on a date
    Rates {
        /// Date (YYYY-MM-DD)
        date: String,
    },

    /// Convert an amount between two currencies
    Convert {
        /// Date (YYYY-MM-DD)
        date: String,
        /// Source currency code
        source: String,
        /// Target currency code
        target: String,
        /// Amount in the source currency
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },

    /// Highest rate of a currency within a period
    Highest {
        start: String,
        end: String,
        currency: String,
    },

    /// Average rate of a currency within a period
    Average {
        start: String,
        end: String,
        currency: String,
    },

    /// Summarise the loaded dataset
    Dataset,
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".fx-rates").join("config.toml"))
}

fn parse_amount(value: &str) -> RateResult<Decimal> {
    Decimal::from_str(value)
        .map_err(|_| RateError::Parsing(format!("Invalid amount `{}`", value)))
}

fn run(cli: Cli) -> RateResult<()> {
    let config_path = cli.config.clone().or_else(default_config_path);
    let mut config = ServiceConfig::load_or_default(config_path.as_deref());
    if let Some(data) = cli.data {
        config.default_dataset = Some(data);
    }

    if config.default_dataset.is_none() {
        return Err(RateError::Config(
            "No rate file given; pass --data or set default_dataset".to_string(),
        ));
    }

    let service = RateService::from_config(&config)?;

    if cli.verbose {
        let snapshot = service.current_dataset();
        println!(
            "{} v{} ({} rows)",
            "fx-rates".cyan().bold(),
            env!("CARGO_PKG_VERSION"),
            snapshot.len()
        );
    }

    match cli.command {
        Commands::Rates { date } => {
            let row = service.get_by_date(parse_date(&date)?)?;
            println!("{}", row.date.to_string().bold());
            for (currency, rate) in &row.rates {
                println!("  {:<6} {}", currency, rate);
            }
        }
        Commands::Convert {
            date,
            source,
            target,
            amount,
        } => {
            let amount = parse_amount(&amount)?;
            let converted = service.convert(parse_date(&date)?, &source, &target, amount)?;
            println!(
                "{} {} = {} {}",
                amount,
                source,
                converted.to_string().green().bold(),
                target
            );
        }
        Commands::Highest {
            start,
            end,
            currency,
        } => {
            let (start, end) = (parse_date(&start)?, parse_date(&end)?);
            let rate = service.highest(start, end, &currency)?;
            println!(
                "Highest {} between {} and {}: {}",
                currency,
                start,
                end,
                rate.to_string().green().bold()
            );
        }
        Commands::Average {
            start,
            end,
            currency,
        } => {
            let (start, end) = (parse_date(&start)?, parse_date(&end)?);
            let rate = service.average(start, end, &currency)?;
            println!(
                "Average {} between {} and {}: {}",
                currency,
                start,
                end,
                rate.to_string().green().bold()
            );
        }
        Commands::Dataset => print_dataset(&service),
    }

    Ok(())
}

fn print_dataset(service: &RateService) {
    let snapshot = service.current_dataset();
    println!("{}", "Dataset".cyan().bold());
    println!("  Rows:       {}", snapshot.len());
    println!("  Generation: {}", snapshot.generation());

    match snapshot.date_range() {
        Some((first, last)) => println!("  Dates:      {} .. {}", first, last),
        None => println!("  Dates:      {}", "none".dimmed()),
    }

    let mut currencies: Vec<&str> = snapshot
        .rows()
        .iter()
        .flat_map(|row| row.currencies())
        .collect();
    currencies.sort_unstable();
    currencies.dedup();
    println!("  Currencies: {}", currencies.join(", "));
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        eprintln!("{}", format!("[{}]", e.kind()).dimmed());
        process::exit(1);
    }
}
