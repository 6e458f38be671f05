//! pipecheck CLI - Main Entry Point
//!
//! Validates a data-cleaning run of the hosted app: CSV validation of the
//! downloaded output, HTTP health checks, and the browser pipeline itself.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{health, pipeline, run, validate};
use pipecheck_common::DEFAULT_CONFIG_FILE;

/// pipecheck - end-to-end checks for a data-cleaning web app
#[derive(Parser)]
#[command(name = "pipecheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Harness configuration file (missing file means defaults)
    #[arg(long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare an output CSV with the input it was produced from
    Validate(validate::ValidateArgs),

    /// Run HTTP health checks against the site
    Health(health::HealthArgs),

    /// Run the browser pipeline and download the cleaned CSV
    Pipeline(pipeline::PipelineArgs),

    /// Run health checks, the browser pipeline and validation
    Run(run::RunArgs),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let passed = match cli.command {
        Commands::Validate(args) => validate::execute(args, &cli.config, cli.format)?,
        Commands::Health(args) => health::execute(args, &cli.config, cli.format).await?,
        Commands::Pipeline(args) => pipeline::execute(args, &cli.config, cli.format).await?,
        Commands::Run(args) => run::execute(args, &cli.config, cli.format).await?,
        Commands::Version => {
            println!("pipecheck v{}", pipecheck_common::VERSION);
            true
        }
    };

    if !passed {
        std::process::exit(1);
    }
    Ok(())
}
