//! kgacc-eval - Knowledge graph accuracy evaluation
//!
//! Prepares the human-labeled dataset from expert and crowd annotations,
//! estimates knowledge graph accuracy with stratified two-stage cluster
//! sampling, and reports annotation and LLM statistics.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kgacc_common::config::{resolve_config_path, resolve_data_root, DataLayout, TomlConfig};
use kgacc_eval::pipeline::{
    run_error_stats, run_estimate, run_evaluate_llm, run_prepare, run_stats, RunContext,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for kgacc-eval
#[derive(Parser, Debug)]
#[command(name = "kgacc-eval")]
#[command(about = "Knowledge graph accuracy estimation from human annotations")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root folder holding annotations, dataset and sample files
    #[arg(short, long, value_name = "DIR")]
    data_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the human-labeled dataset from expert and crowd annotations
    Prepare,

    /// Estimate per-stratum and overall accuracy with margins of error
    Estimate {
        /// Significance level (overrides the configured value)
        #[arg(long)]
        alpha: Option<f64>,
    },

    /// Report expert agreement and crowd annotation statistics
    Stats,

    /// Report error-type frequencies
    ErrorStats,

    /// Score LLM annotations against the expert ground truth
    EvaluateLlm,
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let config = TomlConfig::load_or_default(config_path.as_deref())
        .context("Failed to load configuration")?;

    init_tracing(&config.logging.level);
    info!("Starting kgacc-eval v{}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) if path.exists() => info!("Configuration: {}", path.display()),
        _ => warn!("No configuration file found, using built-in defaults"),
    }

    let data_root = resolve_data_root(args.data_root.as_deref(), &config);
    info!("Data root: {}", data_root.display());
    let ctx = RunContext::new(DataLayout::new(data_root), config);

    match args.command {
        Command::Prepare => {
            let prepared = run_prepare(&ctx).context("Dataset preparation failed")?;
            println!("{}", prepared.label_counts());
        }
        Command::Estimate { alpha } => {
            let report = run_estimate(&ctx, alpha).context("Accuracy estimation failed")?;
            println!("{}", report);
        }
        Command::Stats => {
            let stats = run_stats(&ctx).context("Annotation statistics failed")?;
            println!("{}", stats);
        }
        Command::ErrorStats => {
            let stats = run_error_stats(&ctx).context("Error statistics failed")?;
            println!("{}", stats);
        }
        Command::EvaluateLlm => {
            let evaluations = run_evaluate_llm(&ctx).context("LLM evaluation failed")?;
            for evaluation in evaluations {
                println!("{}\n", evaluation);
            }
        }
    }

    Ok(())
}
