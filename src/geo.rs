//! Coordinate normalization for fairway notice geometries.
//!
//! ELWIS encodes positions as degree / decimal-minute / hemisphere strings,
//! e.g. `"51 03.269 N"`. The map needs signed decimal degrees. A string that
//! does not have that shape becomes `0.0`; it never fails, so one bad point
//! cannot take down a whole notice. Callers that care can check
//! [`NormalizedGeometry::degraded_points`].

use serde::{Deserialize, Serialize};

use crate::ingest::coerce::{leading_float, leading_int};

/// One geometry vertex as delivered upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmsCoordinate {
    pub lat: String,
    // The generated ELWIS client exposes this as `_long`; the wire name is `long`.
    #[serde(rename = "long", alias = "_long")]
    pub long: String,
}

/// A named geometry attached to a notice (fairway section or object).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub coordinate: Vec<DmsCoordinate>,
}

/// `[latitude, longitude]` in signed decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon(pub f64, pub f64);

/// How a geometry is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Empty,
    Point,
    Path,
}

/// A geometry converted to decimal degrees, positions in upstream order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedGeometry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub shape: Shape,
    pub positions: Vec<LatLon>,
    /// Points where at least one component fell back to `0.0`.
    pub degraded_points: usize,
}

/// Converts `"DD MM.mmm H"` to signed decimal degrees.
///
/// Exactly three whitespace-separated tokens are required. Degrees are read
/// as an integer, minutes as a decimal; `S` and `W` (any case) negate. Any
/// other shape yields `0.0`.
pub fn to_decimal_degrees(text: &str) -> f64 {
    try_decimal_degrees(text).unwrap_or(0.0)
}

/// Like [`to_decimal_degrees`] but reports malformed input as `None`.
pub fn try_decimal_degrees(text: &str) -> Option<f64> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let [degrees, minutes, hemisphere] = tokens.as_slice() else {
        return None;
    };

    let degrees = leading_int(degrees)? as f64;
    let minutes = leading_float(minutes)?;
    let decimal = degrees + minutes / 60.0;

    match hemisphere.to_uppercase().as_str() {
        "S" | "W" => Some(-decimal),
        _ => Some(decimal),
    }
}

/// Converts one vertex; see [`to_decimal_degrees`].
pub fn normalize_pair(coordinate: &DmsCoordinate) -> LatLon {
    LatLon(
        to_decimal_degrees(&coordinate.lat),
        to_decimal_degrees(&coordinate.long),
    )
}

/// Converts an ordered vertex list 1:1, counting degraded points.
pub fn normalize_coordinates(coordinates: &[DmsCoordinate]) -> (Vec<LatLon>, usize) {
    let mut degraded = 0;
    let positions = coordinates
        .iter()
        .map(|c| {
            let lat = try_decimal_degrees(&c.lat);
            let lon = try_decimal_degrees(&c.long);
            if lat.is_none() || lon.is_none() {
                degraded += 1;
            }
            LatLon(lat.unwrap_or(0.0), lon.unwrap_or(0.0))
        })
        .collect();
    (positions, degraded)
}

impl GeoObject {
    pub fn normalize(&self) -> NormalizedGeometry {
        let (positions, degraded_points) = normalize_coordinates(&self.coordinate);
        let shape = match positions.len() {
            0 => Shape::Empty,
            1 => Shape::Point,
            _ => Shape::Path,
        };
        NormalizedGeometry {
            name: self.name.clone(),
            shape,
            positions,
            degraded_points,
        }
    }
}
