// SPDX-License-Identifier: GPL-3.0-only

use barcode_scanner::{Config, Platform};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "barcode-scanner")]
#[command(about = "Scan food barcodes with a camera")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimum milliseconds between detection attempts
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    /// Milliseconds to wait between closing one camera and opening another
    #[arg(long, global = true)]
    settle_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive scanner in the terminal (default)
    Terminal {
        /// Scan an image file instead of a camera
        #[arg(short, long)]
        image: Option<PathBuf>,
    },

    /// List available cameras
    List,

    /// Scan one barcode and print it
    Scan {
        /// Camera to use: index or device path (from 'barcode-scanner list')
        #[arg(short, long)]
        device: Option<String>,

        /// Scan an image file instead of a camera
        #[arg(short, long, conflicts_with = "device")]
        image: Option<PathBuf>,

        /// Give up after this many seconds
        #[arg(short, long, default_value = "30")]
        timeout: u64,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=barcode_scanner=trace
    // Logs go to stderr so they do not corrupt the terminal UI
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Some(Commands::Terminal { image }) => run_terminal(config, image)?,
        Some(Commands::List) => cli::list_cameras()?,
        Some(Commands::Scan {
            device,
            image,
            timeout,
        }) => cli::scan_once(config, device, image, timeout)?,
        Some(Commands::Config) => cli::show_config(&config)?,
        None => run_terminal(config, None)?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };

    if let Some(interval) = cli.interval_ms {
        config.detection_interval_ms = interval;
    }
    if let Some(settle) = cli.settle_ms {
        config.device_switch_settle_ms = settle;
    }

    Ok(config)
}

fn run_terminal(config: Config, image: Option<PathBuf>) -> barcode_scanner::AppResult<()> {
    let platform = match image {
        Some(path) => Platform::still_image(path, &config),
        None => Platform::native(&config),
    };
    barcode_scanner::terminal::run(platform, config)
}
