//! dirwatch - report file changes in a directory by polling

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use cli_lib::config::{self, AppConfig, Overrides};
use cli_lib::{logging, ConsoleListener, OutputFormat};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::sync::Arc;
use watcher::DirectoryMonitor;

/// Dirwatch - poll a directory and print created, changed and deleted files
#[derive(Parser)]
#[command(name = "dirwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to watch (overrides `directory` from the config file)
    directory: Option<PathBuf>,

    /// Poll interval in milliseconds (default: 1000)
    #[arg(short, long, allow_negative_numbers = true)]
    interval_ms: Option<i64>,

    /// Config file (default: <config dir>/dirwatch/config.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep notifying other listeners when one fails
    #[arg(long)]
    isolate_faults: bool,

    /// Report a scan as failed after this many milliseconds
    #[arg(long)]
    scan_timeout_ms: Option<u64>,

    /// Event output format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            directory: self.directory.clone(),
            interval_ms: self.interval_ms,
            isolate_faults: self.isolate_faults,
            scan_timeout_ms: self.scan_timeout_ms,
            format: self.format,
            log_file: self.log_file.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::load(cli.config.as_deref())?;
    config.apply(cli.overrides());

    if cli.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let _log_guard = logging::init(
        logging::level_for(cli.verbose, cli.quiet),
        config.log_file.as_deref(),
    )?;

    run(config).await
}

async fn run(config: AppConfig) -> Result<()> {
    config.validate()?;
    let directory = config.require_directory()?;

    let monitor = DirectoryMonitor::builder(directory)
        .config(&config.monitor)?
        .start()
        .with_context(|| format!("Failed to start monitoring {}", directory.display()))?;

    monitor.attach(Arc::new(ConsoleListener::stdout(config.format)));

    eprintln!(
        "{} {} {}",
        "Monitoring directory".bold(),
        monitor.directory().display(),
        format!("(every {:?})", monitor.interval()).dimmed()
    );
    eprintln!("{}", "Press Ctrl+C to exit.".dimmed());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    monitor.shutdown().await;
    Ok(())
}
