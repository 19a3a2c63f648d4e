use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rpl_collect_abstract::CollectorConfigOverride;
use rpl_collect_core::{RunReport, RunState, analysis};
use rpl_collect_replay::{load_trace, run_trace};

#[derive(Parser, Debug)]
#[command(author, version, about = "Serial log and instrumentation collector for RPL simulations")]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a recorded serial trace through the collector.
    Run(RunArgs),
    /// Convert a finished run's power and topology logs into CSV/JSON.
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Trace file (TOML) with the serial events and canned instrumentation output.
    #[arg(long)]
    trace: PathBuf,

    /// Collector settings (TOML); flags below take precedence.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory receiving the logs and screenshots.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Run timeout in simulated milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Sampling period in simulated microseconds.
    #[arg(long)]
    sampling_period: Option<u64>,

    /// Write a JSON summary of the run.
    #[arg(long)]
    report_out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Data directory of a finished run.
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Where to write powertracker.csv and dodag.json.
    #[arg(long, default_value = "./results")]
    out: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    info!("rpl-collect starting…");

    match cli.command {
        Command::Run(args) => run(args),
        Command::Analyze(args) => {
            let summary = analysis::analyze(&args.data_dir, &args.out)?;
            info!(
                "Wrote {} and {}",
                summary.power_csv.display(),
                summary.dodag_json.display()
            );
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(args: RunArgs) -> Result<()> {
    let trace = load_trace(&args.trace)?;
    let overrides = args.overrides()?;
    let report = run_trace(&trace, &overrides)?;
    log_summary(&report);

    if let Some(path) = &args.report_out {
        write_report(path, &report)?;
    }

    if report.state == RunState::TerminatedOnError {
        anyhow::bail!(
            "collection aborted: {}",
            report.failure.as_deref().unwrap_or("unknown failure")
        );
    }
    Ok(())
}

impl RunArgs {
    /// Settings file first, then individual flags on top.
    fn overrides(&self) -> Result<CollectorConfigOverride> {
        let mut overrides = match &self.config {
            Some(path) => load_config(path)?,
            None => CollectorConfigOverride::default(),
        };
        if let Some(dir) = &self.data_dir {
            overrides.data_dir = Some(dir.clone());
        }
        if let Some(ms) = self.timeout_ms {
            overrides.timeout_ms = Some(ms);
        }
        if let Some(period) = self.sampling_period {
            overrides.sampling_period = Some(period);
        }
        Ok(overrides)
    }
}

fn load_config(path: &Path) -> Result<CollectorConfigOverride> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&content).context("Failed to parse config file")
}

fn log_summary(report: &RunReport) {
    info!(
        "Run {:?} | events: {} | samples: {} | next sample after {}",
        report.state,
        report.events_received,
        report.samples_taken(),
        report.counters.threshold
    );
    if let Some(failure) = &report.failure {
        warn!("Run ended early: {}", failure);
    }
}

fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let data = serde_json::to_vec_pretty(report).context("Failed to serialize run report")?;
    fs::write(path, &data)
        .with_context(|| format!("Failed to write report file {}", path.display()))?;
    Ok(())
}
