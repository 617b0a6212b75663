//! TTL snapshot cache.
//!
//! Each data source has one persisted snapshot. A snapshot younger than the
//! source's TTL is served as-is (HIT); otherwise the source is fetched, the
//! new snapshot persisted, and the fresh data returned (MISS). Age is
//! measured from the store's write time.
//!
//! Per source there is at most one fetch in flight. Callers that find the
//! snapshot stale while a fetch is running wait for it and share its result.
//!
//! Failure policy:
//!   - upstream failure → error, never a fallback to an expired snapshot
//!   - unreadable snapshot within the TTL → treated as stale and refetched
//!   - persistence failure → logged, the fetched data is still returned

pub mod store;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::model::{IngestError, Snapshot};
use self::store::SnapshotStore;

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// Source of "now" for age checks and `fetchedAt` stamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// An upstream that can be fetched and normalized into a cacheable payload.
pub trait DataSource: Send + Sync {
    type Payload: Serialize + DeserializeOwned + Clone + Send + Sync;

    /// Stable identifier; also the snapshot's storage key.
    fn id(&self) -> &str;

    fn ttl(&self) -> Duration;

    /// Downloads and normalizes the payload. `now` is the snapshot's `fetchedAt`.
    fn fetch(&self, now: DateTime<Utc>) -> Result<Self::Payload, IngestError>;
}

// ---------------------------------------------------------------------------
// Errors and results
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Upstream fetch failed for source '{source_id}'")]
    Upstream {
        source_id: String,
        #[source]
        source: IngestError,
    },

    #[error("Snapshot store I/O failed for {}", .path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode snapshot")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode snapshot for source '{source_id}'")]
    Decode {
        source_id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Whether a lookup triggered an upstream fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lookup<T> {
    pub snapshot: Snapshot<T>,
    pub status: CacheStatus,
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

struct FlightRecord<T> {
    completed: u64,
    last: Option<Snapshot<T>>,
}

pub struct SnapshotCache<S: DataSource> {
    source: S,
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    flight: Mutex<FlightRecord<S::Payload>>,
}

impl<S: DataSource> SnapshotCache<S> {
    pub fn new(source: S, store: Arc<dyn SnapshotStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            store,
            clock,
            flight: Mutex::new(FlightRecord {
                completed: 0,
                last: None,
            }),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns the current snapshot, fetching it if stale or absent.
    pub fn get(&self) -> Result<Lookup<S::Payload>, CacheError> {
        let seen = self.lock_flight().completed;

        if let Some(snapshot) = self.read_fresh() {
            return Ok(Lookup {
                snapshot,
                status: CacheStatus::Hit,
            });
        }

        let mut flight = self.lock_flight();
        if flight.completed != seen {
            // A fetch finished while we waited; its result is the fresh one.
            if let Some(snapshot) = flight.last.clone() {
                debug!(source = self.source.id(), "Sharing result of concurrent fetch");
                return Ok(Lookup {
                    snapshot,
                    status: CacheStatus::Hit,
                });
            }
        }

        let snapshot = self.download()?;
        flight.completed += 1;
        flight.last = Some(snapshot.clone());
        Ok(Lookup {
            snapshot,
            status: CacheStatus::Miss,
        })
    }

    /// Fetches regardless of snapshot age.
    pub fn refresh(&self) -> Result<Lookup<S::Payload>, CacheError> {
        let mut flight = self.lock_flight();
        let snapshot = self.download()?;
        flight.completed += 1;
        flight.last = Some(snapshot.clone());
        Ok(Lookup {
            snapshot,
            status: CacheStatus::Miss,
        })
    }

    /// The persisted snapshot and its age, without fetching.
    pub fn peek(&self) -> Result<Option<(Snapshot<S::Payload>, Duration)>, CacheError> {
        let id = self.source.id();
        let Some(modified) = self.store.modified_at(id)? else {
            return Ok(None);
        };
        let snapshot = self.decode(&self.store.read(id)?)?;
        Ok(Some((snapshot, self.clock.now() - modified)))
    }

    fn lock_flight(&self) -> MutexGuard<'_, FlightRecord<S::Payload>> {
        self.flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_fresh(&self) -> Option<Snapshot<S::Payload>> {
        let id = self.source.id();

        let modified = match self.store.modified_at(id) {
            Ok(Some(modified)) => modified,
            Ok(None) => {
                info!(source = id, "No cached snapshot, downloading");
                return None;
            }
            Err(e) => {
                warn!(source = id, error = %e, "Could not stat cached snapshot, downloading");
                return None;
            }
        };

        let age = self.clock.now() - modified;
        if age >= self.source.ttl() {
            info!(
                source = id,
                age_seconds = age.num_seconds(),
                "Cached snapshot expired, downloading"
            );
            return None;
        }

        match self.store.read(id).and_then(|bytes| self.decode(&bytes)) {
            Ok(snapshot) => {
                info!(source = id, age_seconds = age.num_seconds(), "Serving cached snapshot");
                Some(snapshot)
            }
            Err(e) => {
                warn!(source = id, error = %e, "Cached snapshot unreadable, treating as stale");
                None
            }
        }
    }

    fn download(&self) -> Result<Snapshot<S::Payload>, CacheError> {
        let id = self.source.id();
        let now = self.clock.now();

        let payload = self.source.fetch(now).map_err(|e| {
            error!(source = id, error = %e, "Upstream fetch failed");
            CacheError::Upstream {
                source_id: id.to_string(),
                source: e,
            }
        })?;

        let snapshot = Snapshot {
            payload,
            fetched_at: now,
        };

        if let Err(e) = self.persist(&snapshot) {
            warn!(source = id, error = %e, "Failed to persist snapshot, serving fetched data anyway");
        } else {
            info!(source = id, "Stored fresh snapshot");
        }

        Ok(snapshot)
    }

    fn persist(&self, snapshot: &Snapshot<S::Payload>) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec_pretty(snapshot).map_err(CacheError::Encode)?;
        self.store.write(self.source.id(), &bytes)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Snapshot<S::Payload>, CacheError> {
        serde_json::from_slice(bytes).map_err(|source| CacheError::Decode {
            source_id: self.source.id().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::store::MemoryStore;
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // --- Test doubles ---

    struct FakeClock(Mutex<DateTime<Utc>>);

    impl FakeClock {
        fn at(now: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(now)))
        }

        fn advance(&self, by: Duration) {
            *self.0.lock().unwrap() += by;
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    /// Returns the call number as payload; fails while `failing` is set.
    struct CountingSource {
        calls: AtomicUsize,
        failing: std::sync::atomic::AtomicBool,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failing: std::sync::atomic::AtomicBool::new(false),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl DataSource for CountingSource {
        type Payload = usize;

        fn id(&self) -> &str {
            "counting"
        }

        fn ttl(&self) -> Duration {
            Duration::minutes(10)
        }

        fn fetch(&self, _now: DateTime<Utc>) -> Result<usize, IngestError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(IngestError::HttpError {
                    url: "http://upstream.test/data".to_string(),
                    status: 503,
                });
            }
            Ok(self.calls.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    struct ReadOnlyStore;

    impl SnapshotStore for ReadOnlyStore {
        fn modified_at(&self, _key: &str) -> Result<Option<DateTime<Utc>>, CacheError> {
            Ok(None)
        }

        fn read(&self, key: &str) -> Result<Vec<u8>, CacheError> {
            Err(CacheError::Store {
                path: PathBuf::from(key),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "empty"),
            })
        }

        fn write(&self, key: &str, _contents: &[u8]) -> Result<(), CacheError> {
            Err(CacheError::Store {
                path: PathBuf::from(key),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 2, 10, 0, 0).unwrap()
    }

    fn cache_with(clock: Arc<FakeClock>) -> SnapshotCache<CountingSource> {
        let store = Arc::new(MemoryStore::new(clock.clone()));
        SnapshotCache::new(CountingSource::new(), store, clock)
    }

    // --- Fresh / stale ---

    #[test]
    fn test_miss_then_hit_within_ttl() {
        let clock = FakeClock::at(start());
        let cache = cache_with(clock.clone());

        let first = cache.get().unwrap();
        assert_eq!(first.status, CacheStatus::Miss);
        assert_eq!(first.snapshot.fetched_at, start());

        clock.advance(Duration::minutes(3));
        let second = cache.get().unwrap();
        assert_eq!(second.status, CacheStatus::Hit);
        assert_eq!(second.snapshot, first.snapshot, "hit must return the stored snapshot unchanged");
        assert_eq!(cache.source().calls(), 1);
    }

    #[test]
    fn test_snapshot_exactly_ttl_old_is_stale() {
        let clock = FakeClock::at(start());
        let cache = cache_with(clock.clone());
        cache.get().unwrap();

        clock.advance(Duration::minutes(10));
        let lookup = cache.get().unwrap();
        assert_eq!(lookup.status, CacheStatus::Miss);
        assert_eq!(lookup.snapshot.payload, 2);
        assert_eq!(lookup.snapshot.fetched_at, start() + Duration::minutes(10));
    }

    #[test]
    fn test_corrupt_snapshot_within_ttl_is_refetched() {
        let clock = FakeClock::at(start());
        let store = Arc::new(MemoryStore::new(clock.clone()));
        store.insert_at("counting", b"{ not json".to_vec(), start());
        let cache = SnapshotCache::new(CountingSource::new(), store, clock);

        let lookup = cache.get().unwrap();
        assert_eq!(lookup.status, CacheStatus::Miss);
        assert_eq!(cache.source().calls(), 1);
    }

    // --- Failures ---

    #[test]
    fn test_upstream_failure_does_not_serve_stale_snapshot() {
        let clock = FakeClock::at(start());
        let cache = cache_with(clock.clone());
        cache.get().unwrap();

        clock.advance(Duration::minutes(11));
        cache.source().failing.store(true, Ordering::SeqCst);

        let result = cache.get();
        match result {
            Err(CacheError::Upstream { source_id, source }) => {
                assert_eq!(source_id, "counting");
                assert!(matches!(source, IngestError::HttpError { status: 503, .. }));
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[test]
    fn test_persistence_failure_still_returns_data() {
        let cache = SnapshotCache::new(CountingSource::new(), Arc::new(ReadOnlyStore), Arc::new(SystemClock));

        let lookup = cache.get().expect("write failure must not fail the lookup");
        assert_eq!(lookup.status, CacheStatus::Miss);
        assert_eq!(lookup.snapshot.payload, 1);
    }

    // --- Refresh / peek ---

    #[test]
    fn test_refresh_ignores_age() {
        let clock = FakeClock::at(start());
        let cache = cache_with(clock.clone());
        cache.get().unwrap();

        let refreshed = cache.refresh().unwrap();
        assert_eq!(refreshed.status, CacheStatus::Miss);
        assert_eq!(refreshed.snapshot.payload, 2);
        assert_eq!(cache.get().unwrap().snapshot.payload, 2);
    }

    #[test]
    fn test_peek_reports_age_without_fetching() {
        let clock = FakeClock::at(start());
        let cache = cache_with(clock.clone());
        assert!(cache.peek().unwrap().is_none());

        cache.get().unwrap();
        clock.advance(Duration::minutes(25));

        let (snapshot, age) = cache.peek().unwrap().expect("snapshot stored");
        assert_eq!(snapshot.payload, 1);
        assert_eq!(age, Duration::minutes(25));
        assert_eq!(cache.source().calls(), 1, "peek must not fetch");
    }

    #[test]
    fn test_status_header_values() {
        assert_eq!(CacheStatus::Hit.as_str(), "HIT");
        assert_eq!(CacheStatus::Miss.as_str(), "MISS");
    }
}
