//! PEGELONLINE REST API (Federal Waterways and Shipping Administration).
//!
//! Provides the current water level, discharge and water temperature for a
//! gauge station. One request returns the station document with every
//! series and its latest reading embedded.
//!
//! API documentation: https://www.pegelonline.wsv.de/webservice/dokuRestapi

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use tracing::debug;

use crate::ingest::check_status;
use crate::model::{IngestError, Station};

pub const PEGELONLINE_BASE_URL: &str = "https://www.pegelonline.wsv.de/webservices/rest-api/v2";

/// Dresden gauge on the Elbe.
pub const DRESDEN_STATION_UUID: &str = "70272185-b2b3-4178-96b8-43bea330dcae";

const CLIENT_USER_AGENT: &str = concat!("Mozilla/5.0 (compatible; elbmon_service/", env!("CARGO_PKG_VERSION"), ")");

/// Builds the station URL with series and current readings included.
pub fn build_station_url(base_url: &str, station_uuid: &str) -> String {
    format!(
        "{}/stations/{}.json?includeTimeseries=true&includeCurrentMeasurement=true",
        base_url.trim_end_matches('/'),
        station_uuid
    )
}

/// Parses a station document.
pub fn parse_station_response(json: &str) -> Result<Station, IngestError> {
    let station: Station = serde_json::from_str(json)?;
    Ok(station)
}

/// Fetches and parses a station document.
pub fn fetch_station(client: &Client, url: &str) -> Result<Station, IngestError> {
    let response = client
        .get(url)
        .header(USER_AGENT, CLIENT_USER_AGENT)
        .header(ACCEPT, "application/json")
        .send()
        .map_err(|source| IngestError::Network {
            url: url.to_string(),
            source,
        })?;

    let body = check_status(url, response)?
        .text()
        .map_err(|source| IngestError::Network {
            url: url.to_string(),
            source,
        })?;

    let station = parse_station_response(&body)?;
    debug!(
        station = %station.shortname,
        series = station.timeseries.len(),
        "Fetched gauge station"
    );
    Ok(station)
}
