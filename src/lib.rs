//! elbmon_service: Elbe river-segment telemetry service (Dresden / Schmilka).
//!
//! Pulls water-quality measurements, gauge readings and fairway notices from
//! their upstream providers, normalizes them, and serves them to the
//! dashboard out of a TTL-bounded local snapshot cache.
//!
//! # Module structure
//!
//! ```text
//! elbmon_service
//! ├── model       - shared data types (Measurement, Station, Snapshot, IngestError, …)
//! ├── config      - service configuration loader (elbmon.toml)
//! ├── logging     - tracing subscriber setup (console + optional rolling file)
//! ├── geo         - degree/minute/hemisphere → decimal degree normalization
//! ├── notices     - ELWIS fairway notice types + validity filtering
//! ├── cache       - TTL snapshot cache (fetch-or-reuse, one in-flight fetch per source)
//! │   └── store   - snapshot storage backends (atomic files, in-memory)
//! ├── sources     - each upstream bound as a cacheable DataSource
//! ├── endpoint    - HTTP API for the dashboard
//! ├── ingest
//! │   ├── coerce      - locale-aware numeric + timestamp coercion
//! │   ├── spreadsheet - SM.xls export: download, decode, tabular parsing
//! │   ├── pegel       - PEGELONLINE station API: URL construction + JSON parsing
//! │   ├── elwis       - ELWIS fairway transfer message query
//! │   └── fixtures (test only) - representative API response payloads
//! └── analysis
//!     └── current_state - reduces a station's series to one current-state summary
//! ```

pub mod analysis;
pub mod cache;
pub mod config;
pub mod endpoint;
pub mod geo;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod notices;
pub mod sources;
