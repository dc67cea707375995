//! scalebench CLI
//!
//! ```bash
//! scalebench run --dataset data/test_10mb.txt --threads 2 --threads 4 --runs 3
//! scalebench latest --format summary
//! scalebench init > scalebench.toml
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use scalebench::config::BenchConfig;
use scalebench::experiment::Synchronization;
use scalebench::orchestrator::Orchestrator;
use scalebench::runner::ProcessTrialRunner;
use scalebench::store::{generate_csv_report, generate_summary, ResultStore};

/// scalebench command-line interface
#[derive(Parser, Debug)]
#[command(name = "scalebench")]
#[command(author, version, about = "Scaling benchmarks for sequential vs parallel word counters")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full experiment matrix
    Run(RunArgs),
    /// Print the most recent experiment record
    Latest {
        /// Directory holding experiment records
        #[arg(long)]
        results_dir: Option<PathBuf>,

        /// Output projection
        #[arg(long, value_enum, default_value_t = Format::Summary)]
        format: Format,
    },
    /// Print a default scalebench.toml
    Init,
}

/// Overrides applied on top of scalebench.toml
#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Configuration file (default: discover scalebench.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dataset input (repeatable)
    #[arg(long = "dataset")]
    datasets: Vec<String>,

    /// Thread count (repeatable)
    #[arg(long = "threads")]
    threads: Vec<u32>,

    /// Synchronization strategy: reduction, atomic, critical (repeatable)
    #[arg(long = "sync")]
    sync: Vec<Synchronization>,

    /// Trials per matrix cell
    #[arg(long)]
    runs: Option<u32>,

    /// Per-trial timeout (e.g., "300s", "5m")
    #[arg(long)]
    timeout: Option<String>,

    /// Directory receiving experiment records
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Sequential counter executable
    #[arg(long)]
    sequential: Option<PathBuf>,

    /// Parallel counter executable
    #[arg(long)]
    parallel: Option<PathBuf>,
}

/// Record projection printed by `latest`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    /// Authoritative JSON record
    Json,
    /// Flattened CSV rows
    Csv,
    /// Human-readable tables
    Summary,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "scalebench=debug"
    } else {
        "scalebench=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Latest {
            results_dir,
            format,
        } => latest(results_dir, format),
        Commands::Init => {
            print!("{}", BenchConfig::default_toml());
            Ok(())
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<BenchConfig> {
    match path {
        Some(path) => BenchConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(BenchConfig::discover()
            .context("failed to load discovered scalebench.toml")?
            .unwrap_or_default()),
    }
}

fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_ref())?;

    if !args.datasets.is_empty() {
        config.matrix.datasets = args.datasets;
    }
    if !args.threads.is_empty() {
        config.matrix.thread_counts = args.threads;
    }
    if !args.sync.is_empty() {
        config.matrix.sync_strategies = args.sync;
    }
    if let Some(runs) = args.runs {
        config.runner.runs = runs;
    }
    if let Some(timeout) = args.timeout {
        config.runner.timeout = timeout;
    }
    if let Some(dir) = args.results_dir {
        config.output.directory = dir;
    }
    if let Some(sequential) = args.sequential {
        config.binaries.sequential = sequential;
    }
    if let Some(parallel) = args.parallel {
        config.binaries.parallel = parallel;
    }

    let plan = config.plan()?;
    let runner = ProcessTrialRunner::from_plan(&plan);
    let store = ResultStore::new(plan.results_dir());

    let record = Orchestrator::new(plan, runner, store).run()?;
    print!("{}", generate_summary(&record));
    Ok(())
}

fn latest(results_dir: Option<PathBuf>, format: Format) -> anyhow::Result<()> {
    let dir = match results_dir {
        Some(dir) => dir,
        None => load_config(None)?.output.directory,
    };
    let record = ResultStore::new(dir).load_latest()?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        Format::Csv => print!("{}", generate_csv_report(&record)),
        Format::Summary => print!("{}", generate_summary(&record)),
    }
    Ok(())
}
