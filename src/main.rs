//! Breakout tracker - main entry point
//!
//! This binary provides two subcommands:
//! - monitor: Load breakout prices and watch live LTPs for re-touches
//! - validate: Check a watchlist file against the exchange scrip master

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "breakout-tracker")]
#[command(about = "Intraday breakout re-touch tracker with live LTP alerts", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load breakout prices and run the live monitor
    Monitor {
        /// Breakout file (JSON list of Symbol / Breakout / "Time (IST)")
        #[arg(short, long, default_value = "symbols_time.txt")]
        watchlist: String,

        /// Path to configuration file (defaults are used when omitted)
        #[arg(short, long)]
        config: Option<String>,

        /// Cycle interval in seconds (overrides config)
        #[arg(long)]
        interval: Option<u64>,

        /// Alert cooldown per symbol in seconds (overrides config)
        #[arg(long)]
        cooldown: Option<u64>,
    },

    /// Resolve a watchlist file without logging in or monitoring
    Validate {
        /// Breakout file (JSON list of Symbol / Breakout / "Time (IST)")
        #[arg(short, long, default_value = "symbols_time.txt")]
        watchlist: String,

        /// Path to configuration file (defaults are used when omitted)
        #[arg(short, long)]
        config: Option<String>,
    },
}

/// Directory that receives one log file per run
const LOG_DIR: &str = "logs";

/// HTTP stack crates whose debug output drowns the cycle logs
const QUIET_CRATES: [&str; 5] = ["hyper", "hyper_util", "reqwest", "rustls", "h2"];

fn log_filter(verbose: bool) -> EnvFilter {
    let base = if verbose { "debug" } else { "info" };
    let directives = std::iter::once(base.to_string())
        .chain(QUIET_CRATES.iter().map(|krate| format!("{}=warn", krate)))
        .collect::<Vec<_>>()
        .join(",");
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives))
}

/// Console plus `logs/{subcommand}_{started}.log`. `RUST_LOG` overrides
/// the level chosen by `--verbose`.
fn init_tracing(verbose: bool, subcommand: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(LOG_DIR)?;
    let file_name = format!(
        "{}_{}.log",
        subcommand,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let run_log = tracing_appender::rolling::never(LOG_DIR, &file_name);

    tracing_subscriber::registry()
        .with(log_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true)
                .with_ansi(true),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(run_log)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false),
        )
        .init();

    Ok(PathBuf::from(LOG_DIR).join(file_name))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Monitor { .. } => "monitor",
        Commands::Validate { .. } => "validate",
    };
    let log_path = init_tracing(cli.verbose, command_name)?;
    info!("Writing run log to {}", log_path.display());

    match cli.command {
        Commands::Monitor {
            watchlist,
            config,
            interval,
            cooldown,
        } => commands::monitor::run(watchlist, config, interval, cooldown),

        Commands::Validate { watchlist, config } => commands::validate::run(watchlist, config),
    }
}
