//! Command-line interface.
//!
//! Commands:
//! - data-onboarding run --config <path> [--store-dir <dir>] [--log-dir <dir>]
//! - data-onboarding run --env [--store-dir <dir>] [--log-dir <dir>]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::PipelineConfig;
use crate::context::PipelineContext;
use crate::error::OnboardingResult;
use crate::observability::{CompositeSink, FileSink, LogSink, StdErrSink};
use crate::pipeline::{self, RunSummary};
use crate::store::FsStore;

const DEFAULT_STORE_DIR: &str = "./data/store";
const DEFAULT_LOG_DIR: &str = "./logs";

/// Validate a tabular batch and load it into a document store
#[derive(Parser, Debug)]
#[command(name = "data-onboarding")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Ingest, validate and load one batch
    Run {
        /// Path to a JSON configuration file
        #[arg(long, required_unless_present = "env", conflicts_with = "env")]
        config: Option<PathBuf>,

        /// Read the configuration from environment variables
        #[arg(long)]
        env: bool,

        /// Store root directory, overriding the configured one
        #[arg(long)]
        store_dir: Option<PathBuf>,

        /// Log directory, overriding the configured one
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

/// Parse arguments, run the command and print its outcome.
pub fn run() -> OnboardingResult<()> {
    let cli = Cli::parse_args();
    let summary = run_command(cli.command)?;
    print_summary(&summary);
    Ok(())
}

/// Execute one parsed command.
pub fn run_command(command: Command) -> OnboardingResult<RunSummary> {
    match command {
        Command::Run {
            config,
            env: _,
            store_dir,
            log_dir,
        } => {
            let config = match config {
                Some(path) => PipelineConfig::from_json_path(path)?,
                None => PipelineConfig::from_env()?,
            };
            run_with_config(config, store_dir, log_dir)
        }
    }
}

fn run_with_config(
    config: PipelineConfig,
    store_dir: Option<PathBuf>,
    log_dir: Option<PathBuf>,
) -> OnboardingResult<RunSummary> {
    let log_dir = log_dir
        .or_else(|| config.logging_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));
    let store_dir = store_dir
        .or_else(|| config.store_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_DIR));

    let sink = run_sink(&log_dir)?;
    let ctx = PipelineContext::new(config).with_sink(sink);
    pipeline::run(&ctx, &FsStore::new(store_dir))
}

/// Dated log file under `log_dir`, plus stderr.
fn run_sink(log_dir: &Path) -> OnboardingResult<Arc<dyn LogSink>> {
    fs::create_dir_all(log_dir)?;
    let file = log_dir.join(format!("main_{}", chrono::Local::now().format("%y%m%d")));
    Ok(Arc::new(CompositeSink::new(vec![
        Arc::new(FileSink::new(file)),
        Arc::new(StdErrSink),
    ])))
}

fn print_summary(summary: &RunSummary) {
    let load = &summary.load;
    println!(
        "loaded {} rows from {} ({} columns)",
        load.inserted, load.metadata.file, load.metadata.column_count
    );
    println!(
        "documents: {} -> {} (execution date {})",
        load.initial_count, load.final_count, load.metadata.execution_date
    );
    let validation = &summary.validation;
    if validation.removed_duplicates > 0 {
        println!("removed {} duplicated rows", validation.removed_duplicates);
    }
    if !validation.sign_corrected_columns.is_empty() {
        println!(
            "sign-corrected columns: {}",
            validation.sign_corrected_columns.join(", ")
        );
    }
}
