//! Current-state extraction for a PEGELONLINE station.
//!
//! `extract_current_state` takes the station document produced by
//! `ingest::pegel` and pulls the latest level, flow and water temperature
//! out of its series, so the dashboard can ask "how high is the Elbe in
//! Dresden right now?" without walking the series list itself.
//!
//! Series are routed by short code. Anything other than `W`, `Q` and `WT`
//! (air temperature, raw sensor channels, …) is ignored, as are series that
//! carry no current reading.

use chrono::{DateTime, Utc};

use crate::model::{
    CurrentMeasurement, CurrentStateSummary, Station, SERIES_FLOW, SERIES_LEVEL,
    SERIES_WATER_TEMPERATURE,
};

/// Which summary field a series feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Level,
    Flow,
    WaterTemperature,
    Other,
}

impl SeriesKind {
    pub fn from_shortname(shortname: &str) -> Self {
        match shortname {
            SERIES_LEVEL => SeriesKind::Level,
            SERIES_FLOW => SeriesKind::Flow,
            SERIES_WATER_TEMPERATURE => SeriesKind::WaterTemperature,
            _ => SeriesKind::Other,
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Reduces a station's series to one current-state summary.
///
/// The summary is always fully constructed; a station with no usable series
/// yields a summary whose readings are all `None`.
///
/// `measurement_time` is the level reading's timestamp whenever the station
/// has one. Without a level reading it falls back to the first flow or water
/// temperature reading in station order.
pub fn extract_current_state(station: Station, fetched_at: DateTime<Utc>) -> CurrentStateSummary {
    let mut summary = CurrentStateSummary {
        station: station.clone(),
        current_level: None,
        current_flow: None,
        current_temperature: None,
        measurement_time: None,
        level_trend: None,
        flow_trend: None,
        water_level_state: None,
        gauge_zero: None,
        fetched_at,
    };

    for series in &station.timeseries {
        let Some(measurement) = &series.current_measurement else {
            continue;
        };

        // Route by series code
        match SeriesKind::from_shortname(&series.shortname) {
            SeriesKind::Level => {
                summary.current_level = Some(measurement.value);
                summary.level_trend = measurement.trend;
                summary.water_level_state = level_state(measurement);
                summary.gauge_zero = series.gauge_zero.clone();
                summary.measurement_time = Some(measurement.timestamp.clone());
            }
            SeriesKind::Flow => {
                summary.current_flow = Some(measurement.value);
                summary.flow_trend = measurement.trend;
                fill_measurement_time(&mut summary, measurement);
            }
            SeriesKind::WaterTemperature => {
                summary.current_temperature = Some(measurement.value);
                fill_measurement_time(&mut summary, measurement);
            }
            SeriesKind::Other => {}
        }
    }

    summary
}

/// Sets the time only if no earlier reading has.
fn fill_measurement_time(summary: &mut CurrentStateSummary, measurement: &CurrentMeasurement) {
    if summary.measurement_time.as_deref().is_none_or(str::is_empty) {
        summary.measurement_time = Some(measurement.timestamp.clone());
    }
}

/// MNW/MHW state tag; when absent or empty, the NSW/HSW tag as given.
fn level_state(measurement: &CurrentMeasurement) -> Option<String> {
    measurement
        .state_mnw_mhw
        .clone()
        .filter(|state| !state.is_empty())
        .or_else(|| measurement.state_nsw_hsw.clone())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
