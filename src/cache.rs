//! # Route Cache Module
//!
//! Durable, TTL-bound snapshot of the compiled route table.
//!
//! ## Overview
//!
//! The router consults the cache before compiling its live collection. After a
//! cold build it writes the compiled table back. The record carries the
//! fingerprint of the collection it was built from, so a table built from a
//! different route set is treated as a miss.
//!
//! ## Failure Semantics
//!
//! The cache never fails a request. Missing files, I/O errors, corrupt JSON,
//! unsupported format versions and expired records all become a miss, are
//! logged, and are reflected in [`CacheStats`].
//!
//! ## Concurrency
//!
//! Writers serialize the record to a sibling temporary file and atomically
//! rename it over the cache file, so concurrent readers see either the old or
//! the new record, never a partial one. Counters are atomics.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! let cache = RouteCache::new("var/cache/routes.json", Duration::from_secs(3600));
//! let router = Router::new().with_cache(cache);
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::CacheError;
use crate::router::CompiledTable;

/// Version of the on-disk record layout
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Default TTL for cached route tables
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    version: u32,
    created_at: u64,
    ttl_secs: u64,
    table: CompiledTable,
}

/// Observability snapshot of a [`RouteCache`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Loads that returned a usable table
    pub hits: u64,
    /// Loads that fell back to the live collection
    pub misses: u64,
    /// Size of the cache file in bytes (0 when absent)
    pub size_bytes: u64,
    /// Unix seconds when the current record was written
    pub created_at: Option<u64>,
    /// Unix seconds of the last hit
    pub last_used: Option<u64>,
    /// Configured TTL in seconds
    pub ttl_secs: u64,
    /// Location of the cache file
    pub path: PathBuf,
}

/// File-backed cache of the compiled route table
#[derive(Debug)]
pub struct RouteCache {
    path: PathBuf,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    /// Unix seconds of the last hit, 0 when never used
    last_used: AtomicU64,
}

impl RouteCache {
    /// Create a cache stored at `path` whose records live for `ttl`
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        let path = path.into();
        info!(
            path = %path.display(),
            ttl_secs = ttl.as_secs(),
            "Initializing route cache"
        );
        Self {
            path,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            last_used: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// TTL not expired and the backing file readable
    ///
    /// Uses the file modification time so the check stays a `stat` + `open`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let Ok(meta) = fs::metadata(&self.path) else {
            return false;
        };
        if !meta.is_file() || fs::File::open(&self.path).is_err() {
            return false;
        }
        let age = meta
            .modified()
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .unwrap_or_default();
        age <= self.ttl
    }

    /// Load the stored table, or `None` on any failure
    #[must_use]
    pub fn load(&self) -> Option<CompiledTable> {
        match self.read_record() {
            Ok(record) => {
                self.record_hit();
                debug!(
                    path = %self.path.display(),
                    entries = record.table.entries.len(),
                    "Route cache hit"
                );
                Some(record.table)
            }
            Err(err) => {
                self.record_miss(&err);
                None
            }
        }
    }

    /// Load the stored table only if it was built from a collection with `fingerprint`
    #[must_use]
    pub fn load_matching(&self, fingerprint: &str) -> Option<CompiledTable> {
        match self.read_record() {
            Ok(record) if record.table.fingerprint == fingerprint => {
                self.record_hit();
                debug!(
                    path = %self.path.display(),
                    entries = record.table.entries.len(),
                    "Route cache hit"
                );
                Some(record.table)
            }
            Ok(record) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(
                    path = %self.path.display(),
                    cached_fingerprint = %record.table.fingerprint,
                    live_fingerprint = %fingerprint,
                    "Route cache built from a different route set"
                );
                None
            }
            Err(err) => {
                self.record_miss(&err);
                None
            }
        }
    }

    /// Persist a compiled table, returning whether it was written
    pub fn store(&self, table: &CompiledTable) -> bool {
        match self.write_record(table) {
            Ok(size) => {
                info!(
                    path = %self.path.display(),
                    entries = table.entries.len(),
                    size_bytes = size,
                    "Route cache written"
                );
                true
            }
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "Failed to write route cache"
                );
                false
            }
        }
    }

    /// Remove the cache file. A missing file counts as cleared.
    pub fn clear(&self) -> bool {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Route cache cleared");
                true
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to clear route cache");
                false
            }
        }
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let meta = fs::metadata(&self.path).ok();
        let last_used = self.last_used.load(Ordering::Relaxed);
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size_bytes: meta.as_ref().map(|m| m.len()).unwrap_or(0),
            created_at: meta
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs()),
            last_used: (last_used > 0).then_some(last_used),
            ttl_secs: self.ttl.as_secs(),
            path: self.path.clone(),
        }
    }

    /// Count a dispatch that skipped the cache because [`is_valid`](Self::is_valid) failed
    pub(crate) fn record_invalid(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(path = %self.path.display(), "Route cache not valid, matching live routes");
    }

    /// Count a hit served from the router's in-memory copy of the table
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.last_used.store(now_secs(), Ordering::Relaxed);
    }

    fn record_miss(&self, err: &CacheError) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        match err {
            CacheError::Io(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Route cache empty");
            }
            CacheError::Expired { .. } => {
                debug!(path = %self.path.display(), error = %err, "Route cache expired");
            }
            _ => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "Route cache unreadable, treating as miss"
                );
            }
        }
    }

    fn read_record(&self) -> Result<CacheRecord, CacheError> {
        let bytes = fs::read(&self.path)?;
        let record: CacheRecord = serde_json::from_slice(&bytes)?;
        if record.version != CACHE_FORMAT_VERSION {
            return Err(CacheError::Version {
                found: record.version,
            });
        }
        let age_secs = now_secs().saturating_sub(record.created_at);
        if age_secs > self.ttl.as_secs() {
            return Err(CacheError::Expired { age_secs });
        }
        Ok(record)
    }

    fn write_record(&self, table: &CompiledTable) -> Result<u64, CacheError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let record = CacheRecord {
            version: CACHE_FORMAT_VERSION,
            created_at: now_secs(),
            ttl_secs: self.ttl.as_secs(),
            table: table.clone(),
        };
        let bytes = serde_json::to_vec(&record)?;

        let tmp = self.temp_path();
        let written = fs::File::create(&tmp).and_then(|mut file| {
            file.write_all(&bytes)?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|()| fs::rename(&tmp, &self.path)) {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                debug!(path = %tmp.display(), error = %cleanup, "Temporary cache file not removed");
            }
            return Err(e.into());
        }
        Ok(bytes.len() as u64)
    }

    fn temp_path(&self) -> PathBuf {
        let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "routes".into());
        name.push(format!(".{}.{}.tmp", std::process::id(), seq));
        self.path.with_file_name(name)
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
