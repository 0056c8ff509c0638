use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use mmbench_core::errors::{BenchError, ErrorInfo};
use mmbench_exp::ExperimentConfig;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "mmbench",
    about = "Benchmark sequential, thread-parallel and process-parallel matrix multiplication"
)]
struct Cli {
    /// YAML configuration; built-in defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Project directory holding bin/, data/, results/ and report/.
    #[arg(long)]
    root: Option<PathBuf>,
    /// Override the number of trials per configuration.
    #[arg(long)]
    repetitions: Option<u32>,
    /// Override the per-trial timeout in seconds; 0 disables it.
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Do not run the build command before the sweeps.
    #[arg(long)]
    skip_build: bool,
    /// Only re-render the charts from previously exported tables.
    #[arg(long)]
    report_only: bool,
    /// Log filter directive such as `debug` or `mmbench_exp=trace`.
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let config = load_config(cli)?;
    if cli.report_only {
        commands::report::run(&config)
    } else {
        commands::run::run(&config, cli.skip_build)
    }
}

fn init_tracing(directive: Option<&str>) {
    let filter = match directive {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the configuration, applies command line overrides and pins the
/// project root to an absolute path.
fn load_config(cli: &Cli) -> Result<ExperimentConfig, BenchError> {
    let mut config = match &cli.config {
        Some(path) => ExperimentConfig::from_yaml_path(path)?,
        None => ExperimentConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.project_root = root.clone();
    }
    if let Some(repetitions) = cli.repetitions {
        config.repetitions = repetitions;
    }
    if let Some(secs) = cli.timeout_secs {
        config.trial_timeout_secs = (secs > 0).then_some(secs);
    }
    config.project_root = fs::canonicalize(&config.project_root).map_err(|err| {
        BenchError::Config(
            ErrorInfo::new("config-root", "project root is not accessible")
                .with_context("path", config.project_root.display().to_string())
                .with_hint(err.to_string()),
        )
    })?;
    config.validate()?;
    Ok(config)
}
