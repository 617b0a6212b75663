//! Test fixtures: representative JSON payloads from the upstream APIs.
//!
//! These fixtures are structurally complete but trimmed to what the parsers
//! read. They reflect the real response shapes of:
//!   PEGELONLINE  /stations/{uuid}.json?includeTimeseries=true&includeCurrentMeasurement=true
//!   ELWIS        POST /ftm/search
//!
//! PEGELONLINE station shape:
//!   uuid, number (string), shortname, longname, km, agency, longitude, latitude
//!   water { shortname, longname }
//!   timeseries[]
//!     .shortname            - series code: W (level), Q (flow), WT (water temp), LT (air temp), …
//!     .equidistance         - sampling interval, minutes
//!     .currentMeasurement   - { timestamp, value, trend, stateMnwMhw, stateNswHsw }
//!     .gaugeZero            - only on W
//!
//! Note: the state tags are only populated on the W series; Q and WT carry
//! "unknown" or omit them.

/// Dresden gauge with level, flow, water temperature and an unclassified
/// air-temperature series. Level 112 cm is below mean low water ("low").
pub(crate) fn fixture_dresden_station_json() -> &'static str {
    r#"{
      "uuid": "70272185-b2b3-4178-96b8-43bea330dcae",
      "number": "501060",
      "shortname": "DRESDEN",
      "longname": "DRESDEN",
      "km": 55.6,
      "agency": "WSA ELBE",
      "longitude": 13.738831783620384,
      "latitude": 51.054459765598125,
      "water": { "shortname": "ELBE", "longname": "ELBE" },
      "timeseries": [
        {
          "shortname": "W",
          "longname": "WASSERSTAND ROHDATEN",
          "unit": "cm",
          "equidistance": 15,
          "currentMeasurement": {
            "timestamp": "2025-08-02T10:15:00+02:00",
            "value": 112.0,
            "stateMnwMhw": "low",
            "stateNswHsw": "normal",
            "trend": -1
          },
          "gaugeZero": { "unit": "m. ü. NHN", "value": 102.68, "validFrom": "2019-11-01" }
        },
        {
          "shortname": "Q",
          "longname": "ABFLUSS_ROHDATEN",
          "unit": "m³/s",
          "equidistance": 15,
          "currentMeasurement": {
            "timestamp": "2025-08-02T10:00:00+02:00",
            "value": 147.0,
            "stateMnwMhw": "unknown",
            "stateNswHsw": "unknown",
            "trend": 0
          }
        },
        {
          "shortname": "WT",
          "longname": "WASSERTEMPERATUR",
          "unit": "°C",
          "equidistance": 15,
          "currentMeasurement": {
            "timestamp": "2025-08-02T10:15:00+02:00",
            "value": 22.4
          }
        },
        {
          "shortname": "LT",
          "longname": "LUFTTEMPERATUR",
          "unit": "°C",
          "equidistance": 15,
          "currentMeasurement": {
            "timestamp": "2025-08-02T09:45:00+02:00",
            "value": 26.1
          }
        }
      ]
    }"#
}

/// Station whose flow series is listed before level, and whose level has no
/// MNW/MHW state so the NSW/HSW tag must be used. Water temperature has no
/// current reading.
pub(crate) fn fixture_station_flow_first_json() -> &'static str {
    r#"{
      "uuid": "70272185-b2b3-4178-96b8-43bea330dcae",
      "number": "501060",
      "shortname": "DRESDEN",
      "longname": "DRESDEN",
      "km": 55.6,
      "agency": "WSA ELBE",
      "water": { "shortname": "ELBE", "longname": "ELBE" },
      "timeseries": [
        {
          "shortname": "Q",
          "longname": "ABFLUSS_ROHDATEN",
          "unit": "m³/s",
          "equidistance": 15,
          "currentMeasurement": { "timestamp": "t1", "value": 210.0, "trend": 1 }
        },
        {
          "shortname": "W",
          "longname": "WASSERSTAND ROHDATEN",
          "unit": "cm",
          "equidistance": 15,
          "currentMeasurement": {
            "timestamp": "t2",
            "value": 180.0,
            "stateMnwMhw": "",
            "stateNswHsw": "normal",
            "trend": 1
          },
          "gaugeZero": { "unit": "m. ü. NHN", "value": 102.68, "validFrom": "2019-11-01" }
        },
        {
          "shortname": "WT",
          "longname": "WASSERTEMPERATUR",
          "unit": "°C",
          "equidistance": 15
        }
      ]
    }"#
}

/// Station document without any series (timeseries not requested).
pub(crate) fn fixture_station_without_series_json() -> &'static str {
    r#"{
      "uuid": "70272185-b2b3-4178-96b8-43bea330dcae",
      "number": "501060",
      "shortname": "DRESDEN",
      "longname": "DRESDEN",
      "agency": "WSA ELBE",
      "water": { "shortname": "ELBE", "longname": "ELBE" }
    }"#
}

/// ELWIS FTM search response with three notices:
///   - 2025-0142: open-ended closure since July 2025, fairway section path
///   - 2025-0150: low-water advisory valid 1–10 August 2025, bridge object point
///   - 2025-0163: works starting 1 September 2025 (not yet active in August)
pub(crate) fn fixture_ftm_messages_json() -> &'static str {
    r#"{
      "messages": [
        {
          "ntsNumber": { "organisation": "WSA ELBE", "year": 2025, "number": 142, "serialNumber": 1 },
          "subjectCode": "ANNOUN",
          "contents": "Sperrung der Fahrrinne bei Elbe-km 55,0 bis 56,2",
          "validityPeriod": { "start": "2025-07-15T00:00:00Z" },
          "values": [
            {
              "fairwaySection": {
                "geoObject": {
                  "name": "Elbe km 55,0 - 56,2",
                  "type": "fairway section",
                  "coordinate": [
                    { "lat": "51 03.200 N", "long": "13 43.500 E" },
                    { "lat": "51 03.269 N", "long": "13 44.100 E" },
                    { "lat": "51 03.410 N", "long": "13 44.900 E" }
                  ]
                }
              }
            }
          ]
        },
        {
          "ntsNumber": { "organisation": "WSA ELBE", "year": 2025, "number": 150, "serialNumber": 2 },
          "subjectCode": "WRNING",
          "contents": "Niedrigwasser: eingeschränkte Tauchtiefe",
          "validityPeriod": { "start": "2025-08-01T00:00:00Z", "end": "2025-08-10T23:59:59Z" },
          "values": [
            {
              "object": {
                "geoObject": {
                  "name": "Augustusbrücke",
                  "type": "bridge",
                  "coordinate": [ { "lat": "51 03.269 N", "_long": "13 44.1 E" } ]
                }
              }
            }
          ]
        },
        {
          "ntsNumber": { "organisation": "WSA ELBE", "year": 2025, "number": 163, "serialNumber": 1 },
          "subjectCode": "ANNOUN",
          "contents": "Bauarbeiten am Ufer",
          "validityPeriod": { "start": "2025-09-01T00:00:00Z", "end": null },
          "values": []
        }
      ]
    }"#
}
