//! Service configuration loader - parses elbmon.toml
//!
//! Keeps upstream URLs, TTLs and server settings out of the code so a
//! station, endpoint or cache directory can be changed without recompiling.
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration for the Dresden / Schmilka segment.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::Deserialize;
use thiserror::Error;

use crate::ingest::elwis::{NoticeQuery, ELWIS_BASE_URL};
use crate::ingest::pegel::{DRESDEN_STATION_UUID, PEGELONLINE_BASE_URL};
use crate::ingest::spreadsheet::SPREADSHEET_URL;

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "elbmon.toml";

/// Environment variable overriding [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_PATH_ENV: &str = "ELBMON_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Root of elbmon.toml
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Size of the request worker pool
    #[serde(default = "default_workers")]
    pub workers: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Directory holding one snapshot file per source
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Console level; `RUST_LOG` takes precedence when set
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for daily-rolling log files; console only when unset
    #[serde(default)]
    pub file_dir: Option<PathBuf>,
    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    /// Per-request timeout for every upstream call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub measurements: MeasurementsConfig,
    #[serde(default)]
    pub water_level: WaterLevelConfig,
    #[serde(default)]
    pub notices: NoticesConfig,
}

/// SM.xls water-quality export
#[derive(Debug, Clone, Deserialize)]
pub struct MeasurementsConfig {
    #[serde(default = "default_spreadsheet_url")]
    pub url: String,
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: i64,
}

/// PEGELONLINE gauge station
#[derive(Debug, Clone, Deserialize)]
pub struct WaterLevelConfig {
    #[serde(default = "default_pegelonline_base_url")]
    pub base_url: String,
    #[serde(default = "default_station_uuid")]
    pub station_uuid: String,
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: i64,
}

/// ELWIS fairway notices
#[derive(Debug, Clone, Deserialize)]
pub struct NoticesConfig {
    #[serde(default = "default_elwis_base_url")]
    pub base_url: String,
    #[serde(default = "default_fairway_name")]
    pub fairway_name: String,
    #[serde(default)]
    pub hectometer_start: u32,
    #[serde(default = "default_hectometer_end")]
    pub hectometer_end: u32,
    #[serde(default = "default_notices_ttl_minutes")]
    pub ttl_minutes: i64,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    4
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file_prefix() -> String {
    "elbmon".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_spreadsheet_url() -> String {
    SPREADSHEET_URL.to_string()
}

fn default_pegelonline_base_url() -> String {
    PEGELONLINE_BASE_URL.to_string()
}

fn default_station_uuid() -> String {
    DRESDEN_STATION_UUID.to_string()
}

fn default_elwis_base_url() -> String {
    ELWIS_BASE_URL.to_string()
}

fn default_fairway_name() -> String {
    NoticeQuery::default().fairway_name
}

fn default_hectometer_end() -> u32 {
    NoticeQuery::default().hectometer_end
}

fn default_ttl_minutes() -> i64 {
    10
}

fn default_notices_ttl_minutes() -> i64 {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_dir: None,
            file_prefix: default_log_file_prefix(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            measurements: MeasurementsConfig::default(),
            water_level: WaterLevelConfig::default(),
            notices: NoticesConfig::default(),
        }
    }
}

impl Default for MeasurementsConfig {
    fn default() -> Self {
        Self {
            url: default_spreadsheet_url(),
            ttl_minutes: default_ttl_minutes(),
        }
    }
}

impl Default for WaterLevelConfig {
    fn default() -> Self {
        Self {
            base_url: default_pegelonline_base_url(),
            station_uuid: default_station_uuid(),
            ttl_minutes: default_ttl_minutes(),
        }
    }
}

impl Default for NoticesConfig {
    fn default() -> Self {
        Self {
            base_url: default_elwis_base_url(),
            fairway_name: default_fairway_name(),
            hectometer_start: 0,
            hectometer_end: default_hectometer_end(),
            ttl_minutes: default_notices_ttl_minutes(),
        }
    }
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl SourcesConfig {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

impl MeasurementsConfig {
    pub fn ttl(&self) -> Duration {
        Duration::minutes(self.ttl_minutes)
    }
}

impl WaterLevelConfig {
    pub fn ttl(&self) -> Duration {
        Duration::minutes(self.ttl_minutes)
    }
}

impl NoticesConfig {
    pub fn ttl(&self) -> Duration {
        Duration::minutes(self.ttl_minutes)
    }

    pub fn query(&self) -> NoticeQuery {
        NoticeQuery {
            fairway_name: self.fairway_name.clone(),
            hectometer_start: self.hectometer_start,
            hectometer_end: self.hectometer_end,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Loads configuration from a TOML file.
pub fn load_config(path: impl AsRef<Path>) -> Result<ServiceConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Like [`load_config`], but a missing file yields the defaults.
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<ServiceConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(ServiceConfig::default());
    }
    load_config(path)
}

/// Config path from `ELBMON_CONFIG`, falling back to `elbmon.toml`.
pub fn config_path_from_env() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}
