//! scan-relay - run a command-line scanner as live HTTP sessions.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use scan_relay::config::{ConfigLoader, RelayConfig};
use scan_relay::display;
use scan_relay::scan::{Progress, ScanError, ScanEvent, ScanRegistry};
use scan_relay::web::ScanServer;

#[derive(Parser)]
#[command(
    name = "scan-relay",
    about = "Run a command-line scanner as live, cancellable sessions",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a config file (defaults to .scan-relay.toml, then the user config dir).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the scan API over HTTP.
    Serve {
        /// Address to bind to.
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (falls back to $PORT, then the config file).
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run a single scan in the terminal.
    Scan {
        /// Host, domain or address to scan.
        target: String,
        /// Tools to skip, separated by commas or spaces.
        #[arg(short, long, default_value = "")]
        skip: String,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

/// Port from the `PORT` environment variable, if set and valid.
fn env_port() -> Option<u16> {
    let raw = std::env::var("PORT").ok()?;
    match raw.parse() {
        Ok(port) => Some(port),
        Err(_) => {
            tracing::warn!(value = %raw, "Ignoring invalid PORT");
            None
        }
    }
}

async fn serve(config: RelayConfig, host: Option<String>, port: Option<u16>) -> ExitCode {
    let mut server_config = config.server.clone();
    if let Some(host) = host {
        server_config.host = host;
    }
    if let Some(port) = port.or_else(env_port) {
        server_config.port = port;
    }

    let registry = Arc::new(ScanRegistry::new(
        config.scanner.to_command(),
        config.session_options(),
    ));
    let server = ScanServer::new(registry).with_config(server_config);

    let cancel = server.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_scan(config: &RelayConfig, target: &str, skip: &str) -> Result<ExitCode, ScanError> {
    let registry = ScanRegistry::new(config.scanner.to_command(), config.session_options());
    let id = registry.start_scan(target, skip).await?;
    let session = registry.get(id.as_str()).await?;
    display::print_scan_start(&session);

    let mut events = Box::pin(registry.stream_events(id.as_str()).await?);
    let mut last_progress: Option<Progress> = None;

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(ScanEvent::Data(line)) => display::print_line(&line),
                Some(ScanEvent::Progress(progress)) => {
                    if last_progress != Some(progress) {
                        display::print_progress(progress);
                        last_progress = Some(progress);
                    }
                }
                Some(ScanEvent::Complete) | None => break,
            },
            Ok(()) = tokio::signal::ctrl_c() => {
                display::print_stopping();
                registry.stop_scan(id.as_str()).await?;
            }
        }
    }

    display::print_complete(&session);

    Ok(match session.exit_code() {
        Some(0) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let loader = match cli.config {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Serve { host, port } => serve(config, host, port).await,
        Commands::Scan { target, skip } => match run_scan(&config, &target, &skip).await {
            Ok(code) => code,
            Err(e) => {
                eprintln!("Error: {e}");
                ExitCode::FAILURE
            }
        },
    }
}
