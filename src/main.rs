//! lqmt-forward CLI entry point.
//!
//! Provides `run` and `check` subcommands for forwarding a stream of alerts
//! through the configured tools, or validating a configuration file.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::info;

use lqmt_forward::config::load_config;
use lqmt_forward::logging;
use lqmt_forward::pipeline::Pipeline;

/// lqmt-forward — push alerts to Splunk and Syslog collectors.
#[derive(Parser)]
#[command(name = "lqmt-forward", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, short, global = true, default_value = "lqmt-forward.toml")]
    config: PathBuf,

    /// Enable debug logging regardless of the config file.
    #[arg(long, global = true)]
    debug: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Forward JSON-lines alerts through every configured tool.
    Run {
        /// Alert file, one JSON object per line. `-` reads stdin.
        #[arg(long, default_value = "-")]
        alerts: String,
    },
    /// Load and validate the configuration, then exit.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();

    match cli.command {
        Command::Run { alerts } => handle_run(&cli.config, cli.debug, &alerts).await,
        Command::Check => handle_check(&cli.config, cli.debug),
    }
}

/// Forward alerts through the configured tools.
async fn handle_run(config_path: &Path, debug: bool, alerts: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let debug = debug || config.logging.debug;

    let _logging_guard = match &config.logging.logs_dir {
        Some(dir) => Some(logging::init_production(dir, debug)?),
        None => {
            logging::init_cli(debug);
            None
        }
    };

    let mut pipeline = Pipeline::from_config(&config).await?;
    info!(tools = ?pipeline.tool_names(), "pipeline started");
    pipeline.initialize().await;

    if alerts == "-" {
        pipeline.run_lines(BufReader::new(tokio::io::stdin())).await?;
    } else {
        let file = tokio::fs::File::open(alerts)
            .await
            .with_context(|| format!("failed to open alerts file {alerts}"))?;
        pipeline.run_lines(BufReader::new(file)).await?;
    }

    let report = pipeline.shutdown().await;
    for tool in &report.tools {
        info!(
            tool = %tool.name,
            sent = tool.sent,
            dropped = tool.dropped,
            skipped = tool.skipped,
            disabled = tool.disabled.as_deref().unwrap_or("-"),
            "tool summary"
        );
    }
    Ok(())
}

/// Validate the configuration file.
fn handle_check(config_path: &Path, debug: bool) -> anyhow::Result<()> {
    logging::init_cli(debug);
    let config = load_config(config_path)?;
    println!(
        "{}: ok ({} splunk, {} syslog)",
        config_path.display(),
        config.splunk.len(),
        config.syslog.len()
    );
    Ok(())
}
