//! Core data types for the Elbe monitoring service.
//!
//! This module defines the shared domain model imported by all other modules:
//! the normalized record shapes served to the dashboard, the PEGELONLINE
//! station document, the persisted snapshot envelope, and the ingest error
//! taxonomy.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ingest::coerce::parse_timestamp;

// ---------------------------------------------------------------------------
// Series short codes
// ---------------------------------------------------------------------------

/// PEGELONLINE short code for water level (Wasserstand), in cm.
pub const SERIES_LEVEL: &str = "W";

/// PEGELONLINE short code for discharge (Abfluss), in m³/s.
pub const SERIES_FLOW: &str = "Q";

/// PEGELONLINE short code for water temperature, in °C.
pub const SERIES_WATER_TEMPERATURE: &str = "WT";

// ---------------------------------------------------------------------------
// Water-quality measurements (spreadsheet source)
// ---------------------------------------------------------------------------

/// One row of the water-quality export, taken every 10 minutes.
///
/// Every numeric field is `None` when the source cell was empty or could not
/// be coerced; a `None` is never a stand-in for zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    /// Timestamp exactly as written in the source, e.g. `"02.08.2025 00:10:00"`.
    pub datetime: String,
    /// J/cm²min
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_radiation: Option<f64>,
    /// µS/cm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conductivity: Option<f64>,
    /// °C
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_temperature: Option<f64>,
    /// µg/l
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ammonium_n: Option<f64>,
    /// mg/l
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nitrate_n: Option<f64>,
    /// mg/l
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oxygen_content: Option<f64>,
    /// %
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oxygen_saturation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph_value: Option<f64>,
    /// Spectral absorption coefficient at 254 nm, 1/m
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sak254: Option<f64>,
    /// TE/F
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turbidity: Option<f64>,
    /// km/h
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,
    /// Degrees from north
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_direction: Option<f64>,
    /// °C
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_temperature: Option<f64>,
    /// µg/l
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chlorophyll: Option<f64>,
}

impl Measurement {
    /// Parses `datetime` into a calendar timestamp, if it is well formed.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.datetime)
    }
}

/// Data-quality counters collected while parsing a spreadsheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseDiagnostics {
    /// Data rows dropped because they were blank or had no datetime.
    pub skipped_rows: usize,
    /// Non-blank numeric cells that could not be coerced and were omitted.
    pub defaulted_fields: usize,
}

/// The full water-quality export for one station, in source row order.
///
/// Constructed once by the parser and never modified; `total_records`
/// always equals the number of measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementDataset {
    station_name: String,
    measurements: Vec<Measurement>,
    fetched_at: DateTime<Utc>,
    total_records: usize,
    #[serde(default)]
    diagnostics: ParseDiagnostics,
}

impl MeasurementDataset {
    pub fn new(
        station_name: String,
        measurements: Vec<Measurement>,
        fetched_at: DateTime<Utc>,
        diagnostics: ParseDiagnostics,
    ) -> Self {
        let total_records = measurements.len();
        Self {
            station_name,
            measurements,
            fetched_at,
            total_records,
            diagnostics,
        }
    }

    pub fn station_name(&self) -> &str {
        &self.station_name
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn total_records(&self) -> usize {
        self.total_records
    }

    pub fn diagnostics(&self) -> ParseDiagnostics {
        self.diagnostics
    }

    /// Earliest and latest parseable measurement timestamps.
    ///
    /// Rows are chronological in the source, so this is the timestamp of the
    /// first and last row that parse, not a min/max scan.
    pub fn time_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let first = self.measurements.iter().find_map(Measurement::timestamp)?;
        let last = self
            .measurements
            .iter()
            .rev()
            .find_map(Measurement::timestamp)?;
        Some((first, last))
    }
}

// ---------------------------------------------------------------------------
// Gauge station (PEGELONLINE source)
// ---------------------------------------------------------------------------

/// A PEGELONLINE gauge station with its time series.
///
/// Field names follow the REST API v2 JSON document so the same type is used
/// for deserializing the upstream payload and for serving it back out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub uuid: String,
    pub number: String,
    pub shortname: String,
    pub longname: String,
    /// Kilometer mark on the waterway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub km: Option<f64>,
    pub agency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    pub water: Water,
    #[serde(default)]
    pub timeseries: Vec<StationSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Water {
    pub shortname: String,
    pub longname: String,
}

/// One physical quantity measured at a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationSeries {
    pub shortname: String,
    pub longname: String,
    pub unit: String,
    /// Sampling interval in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equidistance: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_measurement: Option<CurrentMeasurement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gauge_zero: Option<GaugeZero>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentMeasurement {
    pub timestamp: String,
    pub value: f64,
    /// State relative to mean low / mean high water (water level only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_mnw_mhw: Option<String>,
    /// State relative to navigational low / high water (water level only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_nsw_hsw: Option<String>,
    /// 1 = rising, 0 = steady, -1 = falling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_nr: Option<i32>,
}

/// Reference height ("Pegelnullpunkt") of a water-level gauge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GaugeZero {
    pub unit: String,
    pub value: f64,
    pub valid_from: String,
}

/// Current state of a station, reduced from its series.
///
/// See `analysis::current_state::extract_current_state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStateSummary {
    pub station: Station,
    /// cm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_level: Option<f64>,
    /// m³/s
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_flow: Option<f64>,
    /// °C
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_trend: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_trend: Option<i32>,
    /// Qualitative level tag such as `"low"`, `"normal"` or `"high"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_level_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gauge_zero: Option<GaugeZero>,
    pub fetched_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Snapshot envelope
// ---------------------------------------------------------------------------

/// A normalized payload together with the moment it was downloaded.
///
/// One snapshot exists per data source; a new download replaces it whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot<T> {
    pub payload: T,
    pub fetched_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching or decoding an upstream payload.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    /// Connection, TLS, timeout or body-transfer failure.
    #[error("Network request failed for {url}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx HTTP response.
    #[error("HTTP error {status} from {url}")]
    HttpError { url: String, status: u16 },

    /// The spreadsheet bytes could not be decoded.
    #[error("Failed to decode workbook")]
    Workbook(#[from] calamine::Error),

    /// The workbook decoded but contains no worksheet.
    #[error("Workbook contains no worksheets")]
    EmptyWorkbook,

    /// The response body could not be deserialized.
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),
}
