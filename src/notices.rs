//! ELWIS fairway transfer messages (FTM) and their validity filtering.
//!
//! Notices arrive as issued: closures, low-water advisories, construction
//! works. Each carries an optional validity window. Only notices whose
//! window contains the query time are shown; the rest are kept in the
//! cached payload and dropped at read time, so a notice becomes visible the
//! moment its window opens without a re-fetch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::geo::{GeoObject, NormalizedGeometry};
use crate::ingest::coerce::parse_timestamp;

/// Composite key of a notice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NtsNumber {
    pub organisation: String,
    pub year: i32,
    pub number: i64,
    pub serial_number: i64,
}

/// Validity window; a missing or unreadable bound is open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidityPeriod {
    #[serde(default, deserialize_with = "lenient_bound", skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_bound", skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

/// Reads a window bound as ISO 8601, with or without an offset. Offset-less
/// times are taken as UTC.
fn lenient_bound<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<serde_json::Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let parsed = raw.as_str().and_then(parse_timestamp).map(|ts| ts.and_utc());
    if parsed.is_none() {
        warn!(bound = %raw, "Unreadable validity bound, treating as open");
    }
    Ok(parsed)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ValidityPeriod {
    /// Both bounds are inclusive.
    pub fn contains(&self, as_of: DateTime<Utc>) -> bool {
        if self.start.is_some_and(|start| as_of < start) {
            return false;
        }
        if self.end.is_some_and(|end| as_of > end) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoCarrier {
    pub geo_object: GeoObject,
}

/// One affected location of a notice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fairway_section: Option<GeoCarrier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<GeoCarrier>,
}

impl MessageValue {
    fn geo_objects(&self) -> impl Iterator<Item = &GeoObject> {
        self.fairway_section
            .iter()
            .chain(self.object.iter())
            .map(|carrier| &carrier.geo_object)
    }
}

/// A fairway notice as issued upstream. Never modified after receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryMessage {
    pub nts_number: NtsNumber,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub validity_period: ValidityPeriod,
    #[serde(default, deserialize_with = "null_as_default")]
    pub values: Vec<MessageValue>,
}

impl AdvisoryMessage {
    pub fn is_active(&self, as_of: DateTime<Utc>) -> bool {
        self.validity_period.contains(as_of)
    }

    /// Normalized geometries of every value, fairway section before object.
    pub fn geometries(&self) -> Vec<NormalizedGeometry> {
        self.values
            .iter()
            .flat_map(MessageValue::geo_objects)
            .map(GeoObject::normalize)
            .collect()
    }
}

/// Keeps the notices active at `as_of`, in input order.
pub fn filter_active(messages: &[AdvisoryMessage], as_of: DateTime<Utc>) -> Vec<AdvisoryMessage> {
    messages
        .iter()
        .filter(|message| message.is_active(as_of))
        .cloned()
        .collect()
}

/// A geometry with the key of the notice it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeGeometry {
    pub nts_number: NtsNumber,
    pub geometry: NormalizedGeometry,
}

/// Flattens every notice's geometries for the map view.
pub fn geo_objects(messages: &[AdvisoryMessage]) -> Vec<NoticeGeometry> {
    messages
        .iter()
        .flat_map(|message| {
            message.geometries().into_iter().map(|geometry| NoticeGeometry {
                nts_number: message.nts_number.clone(),
                geometry,
            })
        })
        .collect()
}

/// A notice paired with its normalized geometries, as served to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveNotice {
    #[serde(flatten)]
    pub message: AdvisoryMessage,
    pub geometries: Vec<NormalizedGeometry>,
}

/// Active notices at `as_of` with their geometries.
pub fn active_notices(messages: &[AdvisoryMessage], as_of: DateTime<Utc>) -> Vec<ActiveNotice> {
    filter_active(messages, as_of)
        .into_iter()
        .map(|message| {
            let geometries = message.geometries();
            ActiveNotice { message, geometries }
        })
        .collect()
}
