mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::analysis::{MetricsArgs, ProjectArgs, SimulateArgs};

/// Rental property investment analytics with decimal precision
#[derive(Parser)]
#[command(
    name = "rentrisk",
    version,
    about = "Rental property investment analytics and risk simulation",
    long_about = "Computes deterministic rental investment metrics (cap rate, \
                  cash-on-cash, DSCR, ROI), multi-year cash flow projections, \
                  and Monte Carlo risk profiles from a property description \
                  supplied as flags, a JSON/YAML file, or piped JSON."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute single-year investment metrics
    Metrics(MetricsArgs),
    /// Project cash flows over the holding period
    Project(ProjectArgs),
    /// Run a Monte Carlo cash flow risk simulation
    Simulate(SimulateArgs),
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

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Metrics(args) => commands::analysis::run_metrics(args),
        Commands::Project(args) => commands::analysis::run_project(args),
        Commands::Simulate(args) => commands::analysis::run_simulate(args),
        Commands::Version => {
            println!("rentrisk {}", env!("CARGO_PKG_VERSION"));
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
