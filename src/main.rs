//! Elbe Monitoring Service - HTTP API
//!
//! Serves the Dresden / Schmilka river-segment data to the dashboard:
//! 1. Water-quality measurements from the Saxon SM.xls export
//! 2. Current gauge state from PEGELONLINE
//! 3. Active fairway notices from ELWIS
//!
//! Every response comes out of a local snapshot cache that is refreshed
//! from upstream once its TTL has passed.
//!
//! Usage:
//!   cargo run --release                          # Use elbmon.toml (or defaults)
//!   cargo run --release -- --config other.toml   # Use another config file
//!   cargo run --release -- --port 9000           # Override the listen port
//!
//! Environment:
//!   ELBMON_CONFIG - config file path (overridden by --config)
//!   RUST_LOG      - tracing filter directives (overrides logging.level)

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use elbmon_service::cache::SystemClock;
use elbmon_service::config::{self, ServiceConfig};
use elbmon_service::endpoint;
use elbmon_service::logging;
use elbmon_service::sources::ServiceCaches;

fn main() {
    dotenv::dotenv().ok();

    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    let mut config_path: PathBuf = config::config_path_from_env();
    let mut port_override: Option<u16> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if i + 1 < args.len() {
                    config_path = PathBuf::from(&args[i + 1]);
                    i += 2;
                } else {
                    eprintln!("Error: --config requires a file path");
                    std::process::exit(1);
                }
            }
            "--port" => {
                match args.get(i + 1).and_then(|p| p.parse().ok()) {
                    Some(port) => port_override = Some(port),
                    None => {
                        eprintln!("Error: --port requires a port number");
                        std::process::exit(1);
                    }
                }
                i += 2;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                eprintln!("Usage: {} [--config PATH] [--port PORT]", args[0]);
                std::process::exit(1);
            }
        }
    }

    let mut config: ServiceConfig = match config::load_config_or_default(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", endpoint::describe_error(&e));
            std::process::exit(1);
        }
    };
    if let Some(port) = port_override {
        config.server.port = port;
    }

    let _log_guard = match logging::init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("❌ {}", endpoint::describe_error(&e));
            std::process::exit(1);
        }
    };

    info!(
        config = %config_path.display(),
        cache_dir = %config.cache.dir.display(),
        "Starting {} {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let caches = match ServiceCaches::from_config(&config, Arc::new(SystemClock)) {
        Ok(caches) => Arc::new(caches),
        Err(e) => {
            error!(error = %endpoint::describe_error(&e), "Failed to set up data sources");
            std::process::exit(1);
        }
    };

    if let Err(e) = endpoint::start_endpoint_server(&config.server, caches) {
        error!(error = %e, "HTTP endpoint stopped");
        std::process::exit(1);
    }
}
