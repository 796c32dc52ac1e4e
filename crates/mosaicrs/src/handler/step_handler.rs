use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::cache::{CacheStats, CachedRow, InMemoryCache, ResultCache};
use super::progress::StepProgress;

/// One diagnostic message recorded by a step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Progress, cancellation, cache and diagnostics for one task.
///
/// A single handler is shared by the worker running the steps and by any
/// thread reading status or requesting cancellation. `reset` is called before
/// every step and only clears progress; the cache and log live as long as the
/// task.
pub struct StepHandler {
    progress: Mutex<StepProgress>,
    cancel_requested: AtomicBool,
    cache: Box<dyn ResultCache>,
    cache_hits: AtomicUsize,
    cache_misses: AtomicUsize,
    log: Mutex<Vec<LogEntry>>,
}

impl StepHandler {
    pub fn new() -> Self {
        Self::with_cache(Box::new(InMemoryCache::new()))
    }

    /// Creates a handler backed by a custom cache.
    pub fn with_cache(cache: Box<dyn ResultCache>) -> Self {
        Self {
            progress: Mutex::new(StepProgress::default()),
            cancel_requested: AtomicBool::new(false),
            cache,
            cache_hits: AtomicUsize::new(0),
            cache_misses: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Zeroes progress for a new step.
    pub fn reset(&self) {
        if let Ok(mut progress) = self.progress.lock() {
            *progress = StepProgress::default();
        }
    }

    /// Sets the progress pair. `current` never moves backwards within a step.
    pub fn update_progress(&self, current: usize, total: usize) {
        if let Ok(mut progress) = self.progress.lock() {
            progress.current = progress.current.max(current);
            progress.total = total;
        }
    }

    pub fn increment_progress(&self) {
        if let Ok(mut progress) = self.progress.lock() {
            progress.current = progress.current.saturating_add(1);
        }
    }

    /// Consistent copy of the progress pair.
    pub fn progress(&self) -> StepProgress {
        self.progress.lock().map(|p| *p).unwrap_or_default()
    }

    pub fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::Release);
    }

    pub fn should_cancel(&self) -> bool {
        self.cancel_requested.load(Ordering::Acquire)
    }

    /// Looks up a fingerprint. Backend failures count as a miss.
    pub fn get_cache(&self, fingerprint: &str) -> Option<CachedRow> {
        let found = match self.cache.get(fingerprint) {
            Ok(found) => found,
            Err(e) => {
                warn!(fingerprint, "cache lookup failed, treating as miss: {}", e);
                None
            }
        };

        if found.is_some() {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Stores a computed row. A failed write is dropped with a warning.
    pub fn put_cache(&self, fingerprint: String, row: CachedRow) {
        if let Err(e) = self.cache.put(fingerprint, row) {
            warn!("cache write failed, result not cached: {}", e);
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.cache_hits.load(Ordering::Relaxed),
            misses: self.cache_misses.load(Ordering::Relaxed),
            entries: self.cache.len(),
        }
    }

    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        info!(target: "mosaicrs::step", "{}", message);

        if let Ok(mut log) = self.log.lock() {
            log.push(LogEntry {
                timestamp: Utc::now(),
                message,
            });
        }
    }

    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl Default for StepHandler {
    fn default() -> Self {
        Self::new()
    }
}
