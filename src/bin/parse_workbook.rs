#!/usr/bin/env rust
//! Offline Workbook Parse
//!
//! Parses a locally saved water-quality export (SM.xls) with the same code
//! path the service uses, and prints what came out of it. Useful when the
//! portal changes its layout or starts sending unexpected cell formats.
//!
//! Usage:
//!   cargo run --bin parse_workbook -- path/to/SM.xls
//!
//! Options:
//!   --json    Print the full dataset as JSON instead of a summary

use std::env;
use std::fs;

use chrono::Utc;

use elbmon_service::endpoint::describe_error;
use elbmon_service::ingest::coerce::to_iso_string;
use elbmon_service::ingest::spreadsheet::parse_workbook;

fn main() {
    let args: Vec<String> = env::args().collect();
    let as_json = args.iter().any(|a| a == "--json");
    let Some(path) = args.iter().skip(1).find(|a| !a.starts_with("--")) else {
        eprintln!("Usage: {} <workbook.xls> [--json]", args[0]);
        std::process::exit(1);
    };

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("❌ Failed to read {}: {}", path, e);
            std::process::exit(1);
        }
    };

    let dataset = match parse_workbook(&bytes, Utc::now()) {
        Ok(dataset) => dataset,
        Err(e) => {
            eprintln!("❌ {}", describe_error(&e));
            std::process::exit(1);
        }
    };

    if as_json {
        match serde_json::to_string_pretty(&dataset) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("❌ Failed to encode dataset: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    println!("📄 {}", path);
    println!("==============================\n");
    println!("Station:          {}", dataset.station_name());
    println!("Records:          {}", dataset.total_records());

    match dataset.time_span() {
        Some((first, last)) => {
            println!("First timestamp:  {}", to_iso_string(&first));
            println!("Last timestamp:   {}", to_iso_string(&last));
        }
        None => println!("Timestamps:       none parseable"),
    }

    let diagnostics = dataset.diagnostics();
    println!("\nSkipped rows:     {}", diagnostics.skipped_rows);
    println!("Defaulted cells:  {}", diagnostics.defaulted_fields);

    if let Some(latest) = dataset.measurements().last() {
        println!("\nLatest row ({}):", latest.datetime);
        let fields = [
            ("Water temperature (°C)", latest.water_temperature),
            ("Conductivity (µS/cm)", latest.conductivity),
            ("Oxygen content (mg/l)", latest.oxygen_content),
            ("pH", latest.ph_value),
            ("Turbidity (TE/F)", latest.turbidity),
        ];
        for (label, value) in fields {
            match value {
                Some(v) => println!("   {:<24} {}", label, v),
                None => println!("   {:<24} –", label),
            }
        }
    }
}
