use std::fs;
use std::path::{Path, PathBuf};

use aideon_ledger::config::LedgerConfig;
use aideon_ledger::model::{Branch, Period, Selection};
use aideon_ledger::pipeline::Pipeline;
use aideon_ledger::{LedgerError, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging().and_then(|()| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| LedgerError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Analyze(args) => execute_analyze(args),
        Command::Facts(args) => {
            let pipeline = load_pipeline(&args.config)?;
            let (_, facts) = pipeline.facts()?;
            emit(&*facts, None)
        }
        Command::Locate(args) => {
            let pipeline = load_pipeline(&args.config)?;
            let sources = pipeline.locate()?;
            println!("revenue: {}", sources.revenue.path.display());
            println!("costs:   {}", sources.costs.path.display());
            Ok(())
        }
    }
}

fn execute_analyze(args: AnalyzeArgs) -> Result<()> {
    let pipeline = load_pipeline(&args.common.config)?;

    let periods = match (args.periods, args.latest) {
        (Some(periods), _) => Some(periods),
        (None, Some(count)) => {
            let (_, facts) = pipeline.facts()?;
            Some(facts.latest_periods(count))
        }
        (None, None) => None,
    };
    let selection = Selection {
        periods,
        branches: args.branches,
    };

    let report = pipeline.analyze(&selection)?;
    emit(&report, args.output)
}

fn load_pipeline(config: &Path) -> Result<Pipeline> {
    let config = LedgerConfig::from_path(config)?;
    Ok(Pipeline::new(config))
}

fn emit<T: Serialize + ?Sized>(value: &T, output: Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Reconcile revenue and cost workbooks into per-branch financial insights."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the fact table and print the full analysis report as JSON.
    Analyze(AnalyzeArgs),
    /// Print the reconciled fact table as JSON.
    Facts(CommonArgs),
    /// Print the source workbooks that would be used.
    Locate(CommonArgs),
}

#[derive(clap::Args)]
struct CommonArgs {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[derive(clap::Args)]
struct AnalyzeArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Restrict the analysis to these periods.
    #[arg(long, value_delimiter = ',', conflicts_with = "latest")]
    periods: Option<Vec<Period>>,

    /// Restrict the analysis to the N most recent periods.
    #[arg(long)]
    latest: Option<usize>,

    /// Restrict the analysis to these branches.
    #[arg(long, value_delimiter = ',')]
    branches: Option<Vec<Branch>>,

    /// Write the report to this file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}
