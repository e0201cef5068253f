mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::scenarios::ScenariosArgs;
use commands::valuation::ModelArgs;

/// Multi-scenario DCF valuation
#[derive(Parser)]
#[command(
    name = "sdcf",
    version,
    about = "Multi-scenario discounted cash flow valuation",
    long_about = "Values a company under bull, bear, base, rate-hike and rate-cut \
                  scenarios (plus any registered extras) from statement, market and \
                  rate data, with decimal precision. Produces per-scenario valuations, \
                  a scenario summary and two-way sensitivity grids."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log engine diagnostics to stderr (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Value every registered scenario
    Value(ModelArgs),
    /// Build the discount-rate and growth/margin sensitivity grids
    Sensitivity(ModelArgs),
    /// Compare implied prices across scenarios
    Summary(ModelArgs),
    /// List the registered scenarios and their adjustments
    Scenarios(ScenariosArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Value(args) => commands::valuation::run_value(args),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args),
        Commands::Summary(args) => commands::valuation::run_summary(args),
        Commands::Scenarios(args) => commands::scenarios::run_scenarios(args),
        Commands::Version => {
            println!("sdcf {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
