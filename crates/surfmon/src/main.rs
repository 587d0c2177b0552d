//! surfmon - decode and monitor Windsurf client messages
//!
//! Three commands share one configuration file:
//!
//! - `decode`: decode a single message and print a report
//! - `monitor`: watch a directory and show a live dashboard
//! - `configure-api`: point record forwarding at an endpoint

mod commands;
mod report;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use surfmon_core::ConfigStore;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "surfmon")]
#[command(version)]
#[command(about = "Decoder and live monitor for Windsurf client messages", long_about = None)]
struct Cli {
    /// Increase verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "SURFMON_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a single message
    Decode {
        /// Message literal, or a path when --file is given
        input: String,

        /// Treat INPUT as a path to a file holding the message bytes
        #[arg(short, long)]
        file: bool,

        /// Keep a b'...' wrapper instead of stripping it
        #[arg(short, long)]
        raw: bool,

        /// Directory for the persisted record (defaults to the configured one)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Forward records to this endpoint (saved to the configuration)
        #[arg(long)]
        api_endpoint: Option<String>,

        /// API key sent as a bearer token
        #[arg(long, requires = "api_endpoint")]
        api_key: Option<String>,
    },

    /// Watch a directory for new messages and show a live dashboard
    Monitor {
        /// Directory to watch for .msg files
        #[arg(short, long)]
        watch_dir: Option<PathBuf>,

        /// Directory for persisted records and the log file
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Forward records to this endpoint (saved to the configuration)
        #[arg(long)]
        api_endpoint: Option<String>,

        /// API key sent as a bearer token
        #[arg(long, requires = "api_endpoint")]
        api_key: Option<String>,
    },

    /// Configure the endpoint records are forwarded to
    ConfigureApi {
        /// Endpoint URL
        endpoint: String,

        /// API key sent as a bearer token
        #[arg(long)]
        api_key: Option<String>,
    },
}

/// Map the `-v` count to a log level
fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Log filter for a run.
///
/// `-v` wins over `RUST_LOG`; without either, `default` applies.
fn log_filter(verbose: u8, default: Level) -> EnvFilter {
    if verbose > 0 {
        return EnvFilter::new(log_level(verbose).max(default).as_str());
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default.as_str()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The monitor owns the terminal and sets up its own file logging
    if !matches!(cli.command, Commands::Monitor { .. }) {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(log_filter(cli.verbose, Level::WARN))
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    let store = ConfigStore::new(cli.config);

    match cli.command {
        Commands::Decode {
            input,
            file,
            raw,
            output_dir,
            api_endpoint,
            api_key,
        } => {
            commands::decode(
                &store,
                commands::DecodeArgs {
                    input,
                    file,
                    raw,
                    output_dir,
                    api_endpoint,
                    api_key,
                },
            )
            .await
        }
        Commands::Monitor {
            watch_dir,
            output_dir,
            api_endpoint,
            api_key,
        } => {
            commands::monitor(
                &store,
                commands::MonitorArgs {
                    watch_dir,
                    output_dir,
                    api_endpoint,
                    api_key,
                },
                log_filter(cli.verbose, Level::INFO),
            )
            .await
        }
        Commands::ConfigureApi { endpoint, api_key } => {
            commands::configure_api(&store, &endpoint, api_key.as_deref())
        }
    }
}
