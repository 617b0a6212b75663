//! Upstream fetch and decode, one module per provider.

pub mod coerce;
pub mod elwis;
pub mod pegel;
pub mod spreadsheet;

#[cfg(test)]
pub(crate) mod fixtures;

use reqwest::blocking::Response;

use crate::model::IngestError;

/// Maps a non-2xx response to `IngestError::HttpError`.
pub(crate) fn check_status(url: &str, response: Response) -> Result<Response, IngestError> {
    let status = response.status();
    if !status.is_success() {
        return Err(IngestError::HttpError {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response)
}
