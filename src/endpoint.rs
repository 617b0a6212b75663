//! HTTP endpoint for the dashboard
//!
//! Serves each data source out of its snapshot cache, so the dashboard
//! never talks to an upstream directly.
//!
//! Endpoints:
//! - GET /api/water/measurements - Schmilka water-quality dataset
//! - GET /api/water/level - Dresden gauge current state
//! - GET /api/notices - Fairway notices active right now, with map geometries
//! - GET /health - Service health check

use std::error::Error as StdError;
use std::io::Cursor;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use threadpool::ThreadPool;
use tiny_http::{Header, Method, Response, Server, StatusCode};
use tracing::{error, info, warn};

use crate::cache::{CacheStatus, Clock, DataSource, SnapshotCache};
use crate::config::ServerConfig;
use crate::model::Snapshot;
use crate::notices::{active_notices, ActiveNotice};
use crate::sources::ServiceCaches;

const ENDPOINTS: &[&str] = &[
    "/api/water/measurements",
    "/api/water/level",
    "/api/notices",
    "/health",
];

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("Failed to start HTTP server on {address}: {message}")]
    Bind { address: String, message: String },
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// A response before it is handed to the HTTP server.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

impl ApiResponse {
    fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Caching and CORS headers for a served snapshot.
pub fn cache_headers(status: CacheStatus, ttl: chrono::Duration) -> Vec<(String, String)> {
    vec![
        (
            "Cache-Control".to_string(),
            format!("public, max-age={}", ttl.num_seconds()),
        ),
        ("X-Cache-Status".to_string(), status.as_str().to_string()),
        ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
        ("Access-Control-Allow-Methods".to_string(), "GET".to_string()),
        ("Access-Control-Allow-Headers".to_string(), "Content-Type".to_string()),
    ]
}

/// Top-level message plus each `source()` in turn, joined with ": ".
pub fn describe_error(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn error_response(label: &str, err: &dyn StdError) -> ApiResponse {
    ApiResponse::json(
        500,
        serde_json::json!({
            "error": label,
            "message": describe_error(err),
        }),
    )
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Dispatches one request. The query string is ignored.
pub fn route(method: &Method, url: &str, caches: &ServiceCaches) -> ApiResponse {
    if *method != Method::Get {
        return ApiResponse::json(
            405,
            serde_json::json!({ "error": "Method not allowed", "allowed": ["GET"] }),
        );
    }

    let path = url.split('?').next().unwrap_or(url);
    match path {
        "/health" => handle_health(),
        "/api/water/measurements" => serve_cached(
            &caches.measurements,
            "Failed to fetch water measurements",
            |snapshot| snapshot.payload,
        ),
        "/api/water/level" => serve_cached(
            &caches.water_level,
            "Failed to fetch water level data",
            |snapshot| snapshot.payload,
        ),
        "/api/notices" => handle_notices(caches),
        _ => ApiResponse::json(
            404,
            serde_json::json!({
                "error": "Not found",
                "available_endpoints": ENDPOINTS,
            }),
        ),
    }
}

fn handle_health() -> ApiResponse {
    ApiResponse::json(
        200,
        serde_json::json!({
            "status": "ok",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}

fn serve_cached<S, T, F>(cache: &SnapshotCache<S>, label: &str, view: F) -> ApiResponse
where
    S: DataSource,
    T: Serialize,
    F: FnOnce(Snapshot<S::Payload>) -> T,
{
    let lookup = match cache.get() {
        Ok(lookup) => lookup,
        Err(e) => {
            error!(source = cache.source().id(), error = %describe_error(&e), "{}", label);
            return error_response(label, &e);
        }
    };

    let status = lookup.status;
    match serde_json::to_value(view(lookup.snapshot)) {
        Ok(body) => {
            let mut response = ApiResponse::json(200, body);
            response
                .headers
                .extend(cache_headers(status, cache.source().ttl()));
            response
        }
        Err(e) => error_response(label, &e),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NoticesBody {
    messages: Vec<ActiveNotice>,
    fetched_at: DateTime<Utc>,
    as_of: DateTime<Utc>,
}

fn handle_notices(caches: &ServiceCaches) -> ApiResponse {
    let as_of = caches.clock.now();
    serve_cached(&caches.notices, "Failed to fetch fairway notices", |snapshot| NoticesBody {
        messages: active_notices(&snapshot.payload.messages, as_of),
        fetched_at: snapshot.fetched_at,
        as_of,
    })
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

fn into_http(response: ApiResponse) -> Response<Cursor<Vec<u8>>> {
    let body = serde_json::to_string_pretty(&response.body).unwrap_or_default();
    let mut http = Response::from_data(body.into_bytes()).with_status_code(StatusCode(response.status));

    for (name, value) in &response.headers {
        match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(header) => http.add_header(header),
            Err(()) => warn!(header = %name, "Skipping invalid response header"),
        }
    }
    http
}

/// Serves requests until the listener closes.
pub fn start_endpoint_server(config: &ServerConfig, caches: Arc<ServiceCaches>) -> Result<(), EndpointError> {
    let address = config.address();
    let server = Server::http(&address).map_err(|e| EndpointError::Bind {
        address: address.clone(),
        message: e.to_string(),
    })?;

    info!(address = %address, workers = config.workers, "HTTP endpoint listening");
    for endpoint in ENDPOINTS {
        info!("  GET {}", endpoint);
    }

    let pool = ThreadPool::new(config.workers.max(1));
    for request in server.incoming_requests() {
        let caches = Arc::clone(&caches);
        pool.execute(move || {
            let response = route(request.method(), request.url(), &caches);
            info!(
                method = %request.method(),
                url = %request.url(),
                status = response.status,
                "Handled request"
            );
            if let Err(e) = request.respond(into_http(response)) {
                warn!(error = %e, "Failed to send response");
            }
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::MemoryStore;
    use crate::config::ServiceConfig;
    use crate::ingest::elwis::parse_notices_response;
    use crate::ingest::fixtures::fixture_ftm_messages_json;
    use crate::model::{MeasurementDataset, ParseDiagnostics};
    use chrono::TimeZone;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 5, 12, 0, 0).unwrap()
    }

    /// Caches whose upstreams are unreachable; only pre-stored snapshots can be served.
    fn offline_caches() -> (ServiceCaches, Arc<MemoryStore>) {
        let mut config = ServiceConfig::default();
        config.sources.request_timeout_secs = 2;
        config.sources.measurements.url = "http://127.0.0.1:9/SM.xls".to_string();
        config.sources.water_level.base_url = "http://127.0.0.1:9".to_string();
        config.sources.notices.base_url = "http://127.0.0.1:9".to_string();

        let clock: Arc<dyn Clock> = Arc::new(FixedClock(now()));
        let store = Arc::new(MemoryStore::new(clock.clone()));
        let caches = ServiceCaches::new(&config, store.clone(), clock).unwrap();
        (caches, store)
    }

    fn store_snapshot<T: Serialize>(store: &MemoryStore, key: &str, payload: T) {
        let snapshot = Snapshot {
            payload,
            fetched_at: now(),
        };
        store.insert_at(key, serde_json::to_vec(&snapshot).unwrap(), now());
    }

    #[test]
    fn test_cache_headers() {
        let headers = cache_headers(CacheStatus::Miss, chrono::Duration::minutes(10));
        let response = ApiResponse {
            status: 200,
            headers,
            body: serde_json::Value::Null,
        };
        assert_eq!(response.header("cache-control"), Some("public, max-age=600"));
        assert_eq!(response.header("X-Cache-Status"), Some("MISS"));
        assert_eq!(response.header("Access-Control-Allow-Origin"), Some("*"));
        assert_eq!(response.header("Access-Control-Allow-Methods"), Some("GET"));
    }

    #[test]
    fn test_health() {
        let (caches, _) = offline_caches();
        let response = route(&Method::Get, "/health", &caches);
        assert_eq!(response.status, 200);
        assert_eq!(response.body["status"], "ok");
        assert_eq!(response.body["service"], "elbmon_service");
    }

    #[test]
    fn test_unknown_path_lists_endpoints() {
        let (caches, _) = offline_caches();
        let response = route(&Method::Get, "/api/unknown", &caches);
        assert_eq!(response.status, 404);
        assert_eq!(response.body["available_endpoints"].as_array().unwrap().len(), ENDPOINTS.len());
    }

    #[test]
    fn test_non_get_is_rejected() {
        let (caches, _) = offline_caches();
        assert_eq!(route(&Method::Post, "/api/water/level", &caches).status, 405);
    }

    #[test]
    fn test_fresh_measurements_are_served_as_hit() {
        let (caches, store) = offline_caches();
        let dataset = MeasurementDataset::new("Schmilka".to_string(), Vec::new(), now(), ParseDiagnostics::default());
        store_snapshot(&store, "SM", dataset);

        let response = route(&Method::Get, "/api/water/measurements?ts=1", &caches);
        assert_eq!(response.status, 200, "body: {}", response.body);
        assert_eq!(response.header("X-Cache-Status"), Some("HIT"));
        assert_eq!(response.header("Cache-Control"), Some("public, max-age=600"));
        assert_eq!(response.body["stationName"], "Schmilka");
        assert_eq!(response.body["totalRecords"], 0);
    }

    #[test]
    fn test_notices_are_filtered_at_request_time() {
        let (caches, store) = offline_caches();
        let payload = parse_notices_response(fixture_ftm_messages_json()).unwrap();
        store_snapshot(&store, "ftm-messages", payload);

        let response = route(&Method::Get, "/api/notices", &caches);
        assert_eq!(response.status, 200, "body: {}", response.body);
        assert_eq!(response.header("Cache-Control"), Some("public, max-age=300"));

        let messages = response.body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2, "only notices valid on 2025-08-05 are served");
        assert_eq!(messages[0]["geometries"][0]["shape"], "path");
    }

    #[test]
    fn test_upstream_failure_is_500_with_message() {
        let (caches, _) = offline_caches();
        let response = route(&Method::Get, "/api/water/level", &caches);

        assert_eq!(response.status, 500);
        assert_eq!(response.body["error"], "Failed to fetch water level data");
        let message = response.body["message"].as_str().unwrap();
        assert!(message.contains("water-level"), "message should name the source: {}", message);
    }

    #[test]
    fn test_describe_error_walks_sources() {
        let inner = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let outer = crate::cache::CacheError::Store {
            path: "cache/SM.json".into(),
            source: inner,
        };
        assert_eq!(
            describe_error(&outer),
            "Snapshot store I/O failed for cache/SM.json: disk full"
        );
    }
}
