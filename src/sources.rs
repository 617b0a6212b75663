//! The three upstreams bound as cacheable data sources.
//!
//! Each source owns its URL and TTL and shares one blocking HTTP client
//! (with the configured request timeout). `ServiceCaches` wires them to a
//! snapshot store and clock as the endpoint and tools use them.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::blocking::Client;
use tracing::info;

use crate::analysis::current_state::extract_current_state;
use crate::cache::store::{FileStore, SnapshotStore};
use crate::cache::{Clock, DataSource, SnapshotCache};
use crate::config::ServiceConfig;
use crate::ingest::elwis::{build_search_url, fetch_notices, NoticeQuery, NoticeQueryResponse};
use crate::ingest::pegel::{build_station_url, fetch_station};
use crate::ingest::spreadsheet::{fetch_workbook, parse_workbook};
use crate::model::{CurrentStateSummary, IngestError, MeasurementDataset};

pub const MEASUREMENTS_SOURCE_ID: &str = "SM";
pub const WATER_LEVEL_SOURCE_ID: &str = "water-level";
pub const NOTICES_SOURCE_ID: &str = "ftm-messages";

/// Builds the shared blocking client.
pub fn build_client(timeout: std::time::Duration) -> Result<Client, IngestError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(IngestError::ClientBuild)
}

// ---------------------------------------------------------------------------
// Water-quality spreadsheet
// ---------------------------------------------------------------------------

pub struct MeasurementsSource {
    client: Client,
    url: String,
    ttl: Duration,
}

impl MeasurementsSource {
    pub fn new(client: Client, url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            ttl,
        }
    }
}

impl DataSource for MeasurementsSource {
    type Payload = MeasurementDataset;

    fn id(&self) -> &str {
        MEASUREMENTS_SOURCE_ID
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    fn fetch(&self, now: DateTime<Utc>) -> Result<MeasurementDataset, IngestError> {
        let bytes = fetch_workbook(&self.client, &self.url)?;
        let dataset = parse_workbook(&bytes, now)?;

        let diagnostics = dataset.diagnostics();
        info!(
            source = MEASUREMENTS_SOURCE_ID,
            station = dataset.station_name(),
            records = dataset.total_records(),
            skipped_rows = diagnostics.skipped_rows,
            defaulted_fields = diagnostics.defaulted_fields,
            "Parsed water-quality export"
        );
        Ok(dataset)
    }
}

// ---------------------------------------------------------------------------
// Gauge station
// ---------------------------------------------------------------------------

pub struct WaterLevelSource {
    client: Client,
    url: String,
    ttl: Duration,
}

impl WaterLevelSource {
    pub fn new(client: Client, base_url: &str, station_uuid: &str, ttl: Duration) -> Self {
        Self {
            client,
            url: build_station_url(base_url, station_uuid),
            ttl,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl DataSource for WaterLevelSource {
    type Payload = CurrentStateSummary;

    fn id(&self) -> &str {
        WATER_LEVEL_SOURCE_ID
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    fn fetch(&self, now: DateTime<Utc>) -> Result<CurrentStateSummary, IngestError> {
        let station = fetch_station(&self.client, &self.url)?;
        let summary = extract_current_state(station, now);

        info!(
            source = WATER_LEVEL_SOURCE_ID,
            level_cm = ?summary.current_level,
            flow_m3s = ?summary.current_flow,
            measured = ?summary.measurement_time,
            "Extracted current gauge state"
        );
        Ok(summary)
    }
}

// ---------------------------------------------------------------------------
// Fairway notices
// ---------------------------------------------------------------------------

/// Caches the unfiltered search result; validity is applied per request.
pub struct NoticesSource {
    client: Client,
    url: String,
    query: NoticeQuery,
    ttl: Duration,
}

impl NoticesSource {
    pub fn new(client: Client, base_url: &str, query: NoticeQuery, ttl: Duration) -> Self {
        Self {
            client,
            url: build_search_url(base_url),
            query,
            ttl,
        }
    }
}

impl DataSource for NoticesSource {
    type Payload = NoticeQueryResponse;

    fn id(&self) -> &str {
        NOTICES_SOURCE_ID
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    fn fetch(&self, _now: DateTime<Utc>) -> Result<NoticeQueryResponse, IngestError> {
        let response = fetch_notices(&self.client, &self.url, &self.query)?;
        info!(
            source = NOTICES_SOURCE_ID,
            messages = response.messages.len(),
            "Fetched fairway notices"
        );
        Ok(response)
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// One cache per upstream, sharing a store and a clock.
pub struct ServiceCaches {
    pub measurements: SnapshotCache<MeasurementsSource>,
    pub water_level: SnapshotCache<WaterLevelSource>,
    pub notices: SnapshotCache<NoticesSource>,
    pub clock: Arc<dyn Clock>,
}

impl ServiceCaches {
    pub fn new(
        config: &ServiceConfig,
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, IngestError> {
        let sources = &config.sources;
        let client = build_client(sources.request_timeout())?;

        let measurements = MeasurementsSource::new(
            client.clone(),
            sources.measurements.url.clone(),
            sources.measurements.ttl(),
        );
        let water_level = WaterLevelSource::new(
            client.clone(),
            &sources.water_level.base_url,
            &sources.water_level.station_uuid,
            sources.water_level.ttl(),
        );
        let notices = NoticesSource::new(
            client,
            &sources.notices.base_url,
            sources.notices.query(),
            sources.notices.ttl(),
        );

        Ok(Self {
            measurements: SnapshotCache::new(measurements, store.clone(), clock.clone()),
            water_level: SnapshotCache::new(water_level, store.clone(), clock.clone()),
            notices: SnapshotCache::new(notices, store, clock.clone()),
            clock,
        })
    }

    /// Caches backed by snapshot files in the configured cache directory.
    pub fn from_config(config: &ServiceConfig, clock: Arc<dyn Clock>) -> Result<Self, IngestError> {
        let store = Arc::new(FileStore::new(config.cache.dir.clone()));
        Self::new(config, store, clock)
    }
}
