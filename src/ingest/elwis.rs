//! ELWIS fairway transfer message search.
//!
//! Notices for a fairway stretch are requested with a POST to
//! `{base}/ftm/search`, naming the fairway and a hectometer range. The
//! response wraps the matching messages in `{ "messages": [...] }`; they
//! are returned unfiltered (see `notices::filter_active`).

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ingest::check_status;
use crate::model::IngestError;
use crate::notices::AdvisoryMessage;

pub const ELWIS_BASE_URL: &str = "https://elwis.vgerber.io";

/// Search parameters for a fairway stretch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeQuery {
    pub fairway_name: String,
    pub hectometer_start: u32,
    pub hectometer_end: u32,
}

impl Default for NoticeQuery {
    /// The whole Elbe.
    fn default() -> Self {
        Self {
            fairway_name: "Elbe".to_string(),
            hectometer_start: 0,
            hectometer_end: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoticeQueryResponse {
    #[serde(default)]
    pub messages: Vec<AdvisoryMessage>,
}

pub fn build_search_url(base_url: &str) -> String {
    format!("{}/ftm/search", base_url.trim_end_matches('/'))
}

pub fn parse_notices_response(json: &str) -> Result<NoticeQueryResponse, IngestError> {
    let response: NoticeQueryResponse = serde_json::from_str(json)?;
    Ok(response)
}

/// Runs a notice search against `url` (see [`build_search_url`]).
pub fn fetch_notices(client: &Client, url: &str, query: &NoticeQuery) -> Result<NoticeQueryResponse, IngestError> {
    let response = client
        .post(url)
        .header(ACCEPT, "application/json")
        .header(CONTENT_TYPE, "application/json")
        .json(query)
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

    let parsed = parse_notices_response(&body)?;
    debug!(
        fairway = %query.fairway_name,
        messages = parsed.messages.len(),
        "Fetched fairway notices"
    );
    Ok(parsed)
}
