#!/usr/bin/env rust
//! Snapshot Refresh
//!
//! Forces a fresh download of every data source, ignoring snapshot age, and
//! reports each outcome. Run it to warm the cache before starting the
//! service, or to check that all upstreams are reachable.
//!
//! Usage:
//!   cargo run --bin refresh_snapshots
//!
//! Options:
//!   --config PATH   Config file (default: $ELBMON_CONFIG or elbmon.toml)
//!
//! Exits non-zero if any source failed.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use elbmon_service::cache::{CacheError, DataSource, Lookup, SnapshotCache, SystemClock};
use elbmon_service::config;
use elbmon_service::endpoint::describe_error;
use elbmon_service::logging;
use elbmon_service::sources::ServiceCaches;

fn report<S: DataSource>(cache: &SnapshotCache<S>, result: Result<Lookup<S::Payload>, CacheError>) -> bool {
    let id = cache.source().id();
    match result {
        Ok(lookup) => {
            println!("   ✓ {:<14} fetched at {}", id, lookup.snapshot.fetched_at.to_rfc3339());
            true
        }
        Err(e) => {
            println!("   ✗ {:<14} {}", id, describe_error(&e));
            false
        }
    }
}

fn main() {
    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
        .unwrap_or_else(config::config_path_from_env);

    let config = match config::load_config_or_default(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", describe_error(&e));
            std::process::exit(1);
        }
    };

    let _log_guard = match logging::init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("❌ {}", describe_error(&e));
            std::process::exit(1);
        }
    };

    println!("🔄 Refreshing snapshots in {}", config.cache.dir.display());
    println!("==============================\n");

    let caches = match ServiceCaches::from_config(&config, Arc::new(SystemClock)) {
        Ok(caches) => caches,
        Err(e) => {
            eprintln!("❌ {}", describe_error(&e));
            std::process::exit(1);
        }
    };

    let outcomes = [
        report(&caches.measurements, caches.measurements.refresh()),
        report(&caches.water_level, caches.water_level.refresh()),
        report(&caches.notices, caches.notices.refresh()),
    ];

    let failed = outcomes.iter().filter(|ok| !**ok).count();
    println!();
    if failed > 0 {
        println!("❌ {} of {} sources failed", failed, outcomes.len());
        std::process::exit(1);
    }
    println!("✅ All sources refreshed");
}
