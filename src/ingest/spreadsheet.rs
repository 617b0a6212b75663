//! Water-quality export (`SM.xls`) from the Saxon state water portal.
//!
//! The portal publishes one worksheet per station: a header row followed by
//! one row per 10-minute interval with 15 fixed columns (see [`column`]).
//! Cells use German locale formatting and are coerced by
//! [`crate::ingest::coerce`].
//!
//! Pipeline: [`fetch_workbook`] → [`read_workbook`] → [`parse_tabular`]
//! ([`parse_workbook`] composes the last two).

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, USER_AGENT};
use tracing::{debug, warn};

use crate::ingest::check_status;
use crate::ingest::coerce::{parse_numeric, RawCell};
use crate::model::{IngestError, Measurement, MeasurementDataset, ParseDiagnostics};

/// Download URL of the Schmilka export.
pub const SPREADSHEET_URL: &str = "https://www.wasser.sachsen.de/stationen/download/SM.xls";

/// Station name used when the worksheet carries no usable name.
pub const DEFAULT_STATION_NAME: &str = "Schmilka";

// The portal rejects requests that do not look like a browser.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Column positions of the export layout.
pub mod column {
    pub const DATETIME: usize = 0;
    pub const GLOBAL_RADIATION: usize = 1;
    pub const CONDUCTIVITY: usize = 2;
    pub const AIR_TEMPERATURE: usize = 3;
    pub const AMMONIUM_N: usize = 4;
    pub const NITRATE_N: usize = 5;
    pub const OXYGEN_CONTENT: usize = 6;
    pub const OXYGEN_SATURATION: usize = 7;
    pub const PH_VALUE: usize = 8;
    pub const SAK254: usize = 9;
    pub const TURBIDITY: usize = 10;
    pub const WIND_SPEED: usize = 11;
    pub const WIND_DIRECTION: usize = 12;
    pub const WATER_TEMPERATURE: usize = 13;
    pub const TOTAL_CHLOROPHYLL: usize = 14;

    /// Number of columns in the layout.
    pub const COUNT: usize = 15;
}

/// A decoded worksheet: its name and its rows of raw cells.
///
/// Row 0 is the header. Rows are aligned to absolute column positions, and a
/// completely blank row has no cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub name: Option<String>,
    pub rows: Vec<Vec<RawCell>>,
}

// ---------------------------------------------------------------------------
// Tabular parsing
// ---------------------------------------------------------------------------

/// Converts a raw worksheet into a measurement dataset.
///
/// The header row and rows without a datetime are skipped; every other row
/// becomes one [`Measurement`] in source order. Numeric columns are coerced
/// independently, so one bad cell only loses that field.
pub fn parse_tabular(table: &RawTable, fetched_at: DateTime<Utc>) -> MeasurementDataset {
    let mut diagnostics = ParseDiagnostics::default();
    let mut measurements = Vec::with_capacity(table.rows.len().saturating_sub(1));

    for row in table.rows.iter().skip(1) {
        let datetime = match row.get(column::DATETIME) {
            Some(cell) if !cell.is_falsy() => cell.to_text(),
            _ => {
                diagnostics.skipped_rows += 1;
                continue;
            }
        };

        let mut numeric = |index: usize| -> Option<f64> {
            let cell = row.get(index)?;
            let value = parse_numeric(cell);
            if value.is_none() && !cell.is_blank() {
                diagnostics.defaulted_fields += 1;
            }
            value
        };

        measurements.push(Measurement {
            datetime,
            global_radiation: numeric(column::GLOBAL_RADIATION),
            conductivity: numeric(column::CONDUCTIVITY),
            air_temperature: numeric(column::AIR_TEMPERATURE),
            ammonium_n: numeric(column::AMMONIUM_N),
            nitrate_n: numeric(column::NITRATE_N),
            oxygen_content: numeric(column::OXYGEN_CONTENT),
            oxygen_saturation: numeric(column::OXYGEN_SATURATION),
            ph_value: numeric(column::PH_VALUE),
            sak254: numeric(column::SAK254),
            turbidity: numeric(column::TURBIDITY),
            wind_speed: numeric(column::WIND_SPEED),
            wind_direction: numeric(column::WIND_DIRECTION),
            water_temperature: numeric(column::WATER_TEMPERATURE),
            total_chlorophyll: numeric(column::TOTAL_CHLOROPHYLL),
        });
    }

    if diagnostics.defaulted_fields > 0 {
        warn!(
            defaulted_fields = diagnostics.defaulted_fields,
            "Some spreadsheet cells could not be read as numbers and were omitted"
        );
    }

    let station_name = table
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_STATION_NAME)
        .to_string();

    MeasurementDataset::new(station_name, measurements, fetched_at, diagnostics)
}

// ---------------------------------------------------------------------------
// Workbook decoding
// ---------------------------------------------------------------------------

/// Decodes the first worksheet of an XLS/XLSX buffer.
pub fn read_workbook(bytes: &[u8]) -> Result<RawTable, IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(IngestError::EmptyWorkbook)?;
    let range = workbook.worksheet_range(&sheet_name)?;

    // Ranges start at the first used cell; pad so cells keep absolute positions.
    let column_offset = range.start().map(|(_, col)| col as usize).unwrap_or(0);

    let rows = range
        .rows()
        .map(|row| {
            let mut cells = vec![RawCell::Empty; column_offset];
            cells.extend(row.iter().map(cell_from_data));
            while matches!(cells.last(), Some(RawCell::Empty)) {
                cells.pop();
            }
            cells
        })
        .collect::<Vec<_>>();

    debug!(sheet = %sheet_name, rows = rows.len(), "Decoded worksheet");

    Ok(RawTable {
        name: Some(sheet_name),
        rows,
    })
}

/// Decodes and parses an export buffer in one step.
pub fn parse_workbook(bytes: &[u8], fetched_at: DateTime<Utc>) -> Result<MeasurementDataset, IngestError> {
    let table = read_workbook(bytes)?;
    Ok(parse_tabular(&table, fetched_at))
}

fn cell_from_data(data: &Data) -> RawCell {
    match data {
        Data::Empty | Data::Error(_) => RawCell::Empty,
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::Float(f) => RawCell::Number(*f),
        Data::String(s) => RawCell::Text(s.clone()),
        Data::Bool(b) => RawCell::Text(b.to_string()),
        Data::DateTime(_) | Data::DateTimeIso(_) => match data.as_datetime() {
            Some(dt) => RawCell::Text(dt.format("%d.%m.%Y %H:%M:%S").to_string()),
            None => RawCell::Text(data.to_string()),
        },
        Data::DurationIso(s) => RawCell::Text(s.clone()),
    }
}

// ---------------------------------------------------------------------------
// Download
// ---------------------------------------------------------------------------

/// Downloads the export into memory.
pub fn fetch_workbook(client: &Client, url: &str) -> Result<Vec<u8>, IngestError> {
    let response = client
        .get(url)
        .header(USER_AGENT, BROWSER_USER_AGENT)
        .header(ACCEPT, "application/vnd.ms-excel,*/*")
        .header(ACCEPT_LANGUAGE, "de-DE,de;q=0.9,en;q=0.8")
        .header(CACHE_CONTROL, "no-cache")
        .send()
        .map_err(|source| IngestError::Network {
            url: url.to_string(),
            source,
        })?;

    let response = check_status(url, response)?;
    let bytes = response.bytes().map_err(|source| IngestError::Network {
        url: url.to_string(),
        source,
    })?;

    debug!(url, bytes = bytes.len(), "Downloaded spreadsheet");
    Ok(bytes.to_vec())
}
