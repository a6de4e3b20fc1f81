/// Scan progress reporting — lock-free counters bumped by the scan workers
/// and the point-in-time snapshots sampled from them.
use crate::telemetry;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A point-in-time view of a running scan.
///
/// Counters are monotonic non-decreasing across the snapshots of one scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanProgress {
    pub files_seen: u64,
    /// Only present when size collection is enabled.
    pub bytes_seen: Option<u64>,
    pub dirs_completed: u64,
    pub errors: u64,
    pub elapsed: Duration,
    pub files_per_sec: f64,
}

/// Hot-path counters, updated with plain atomic increments.
#[derive(Debug)]
pub(crate) struct ScanCounters {
    files: AtomicU64,
    bytes: AtomicU64,
    dirs: AtomicU64,
    errors: AtomicU64,
    collect_sizes: bool,
    started: Instant,
}

impl ScanCounters {
    pub(crate) fn new(collect_sizes: bool) -> Self {
        Self {
            files: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            dirs: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            collect_sizes,
            started: Instant::now(),
        }
    }

    pub(crate) fn record_file(&self, size: u64) {
        self.files.fetch_add(1, Ordering::Relaxed);
        if self.collect_sizes {
            self.bytes.fetch_add(size, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_dir(&self) {
        self.dirs.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ScanProgress {
        let files_seen = self.files.load(Ordering::Relaxed);
        let elapsed = self.started.elapsed();
        ScanProgress {
            files_seen,
            bytes_seen: self
                .collect_sizes
                .then(|| self.bytes.load(Ordering::Relaxed)),
            dirs_completed: self.dirs.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            elapsed,
            files_per_sec: telemetry::rate(files_seen, elapsed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_hidden_without_size_collection() {
        let counters = ScanCounters::new(false);
        counters.record_file(100);
        let snap = counters.snapshot();
        assert_eq!(snap.files_seen, 1);
        assert_eq!(snap.bytes_seen, None);
    }

    #[test]
    fn bytes_accumulate_with_size_collection() {
        let counters = ScanCounters::new(true);
        counters.record_file(100);
        counters.record_file(23);
        counters.record_dir();
        counters.record_error();
        let snap = counters.snapshot();
        assert_eq!(snap.files_seen, 2);
        assert_eq!(snap.bytes_seen, Some(123));
        assert_eq!(snap.dirs_completed, 1);
        assert_eq!(snap.errors, 1);
    }

    #[test]
    fn snapshots_are_monotonic() {
        let counters = ScanCounters::new(false);
        let first = counters.snapshot();
        counters.record_file(0);
        let second = counters.snapshot();
        assert!(second.files_seen >= first.files_seen);
        assert!(second.elapsed >= first.elapsed);
    }
}
