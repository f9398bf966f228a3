use anyhow::Result;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

use clinisnap::config::{Config, DEFAULT_PORT};
use clinisnap::db::Store;
use clinisnap::server::{self, AppState};
use clinisnap::logging;

/// Delay between configuration retries while the operator restores the
/// data folder.
const RETRY_SECS: u64 = 5;

struct Args {
    config_path: Option<PathBuf>,
    port: u16,
}

fn parse_args() -> Args {
    let argv: Vec<String> = std::env::args().collect();
    let mut args = Args {
        config_path: None,
        port: DEFAULT_PORT,
    };

    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("clinisnap {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < argv.len() {
                    args.config_path = Some(PathBuf::from(&argv[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--port" | "-p" => {
                if i + 1 < argv.len() {
                    match argv[i + 1].parse() {
                        Ok(port) => args.port = port,
                        Err(_) => {
                            eprintln!("Error: invalid port: {}", argv[i + 1]);
                            std::process::exit(1);
                        }
                    }
                    i += 1;
                } else {
                    eprintln!("Error: --port requires a number argument");
                    std::process::exit(1);
                }
            }
            _ => {
                eprintln!("Unknown argument: {}", argv[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    args
}

fn print_help() {
    println!(
        r#"clinisnap - LAN photo-ingestion server for clinic client records

USAGE:
    clinisnap [OPTIONS]

OPTIONS:
    --config, -c PATH   Path to config.json (default: ~/ClinisnapData/config.json)
    --port, -p PORT     Port to bind (default: 8000)
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    CLINISNAP_LOG       Log level (trace, debug, info, warn, error)

The server binds to all interfaces so phones on the same network can reach
the upload pages. Logs are written next to the database file."#
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args();

    // Configuration failures are fatal to the service but retryable: the
    // operator restores the data folder and the next attempt succeeds.
    // Logging is not up yet (the log file lives next to the database), so
    // retry messages go to stderr.
    let config = loop {
        let result = match &args.config_path {
            Some(path) => Config::load_from(path, args.port),
            None => Config::load(args.port),
        };
        match result {
            Ok(config) => break config,
            Err(e) => {
                eprintln!("Failed to load data paths: {e}");
                eprintln!("Retrying in {RETRY_SECS} seconds...");
                tokio::time::sleep(Duration::from_secs(RETRY_SECS)).await;
            }
        }
    };

    // Logging failure should not keep the server from accepting uploads,
    // but the operator still needs to hear about it.
    if let Err(e) = logging::init(&config.log_dir()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let store = Store::open(&config.database)?;
    store.initialize()?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, database = %config.database.display(), "Starting ingestion server");

    let state = AppState::new(config, store);
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    match &result {
        Ok(()) => info!("Ingestion server stopped"),
        Err(e) => error!(error = %e, "Ingestion server crashed"),
    }
    result.map_err(Into::into)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
