/// Copy progress — the mutex-guarded tally the copy workers update, and the
/// snapshots (with throughput and ETA) sampled from it.
///
/// Unlike the scan counters, the copy tally is a multi-field struct read as
/// a whole, so it sits behind a single `parking_lot::Mutex` and every update
/// or snapshot sees a consistent set of fields.
use crate::copier::{CopyOutcome, CopyResult};
use crate::telemetry;
use parking_lot::Mutex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// A point-in-time view of a running copy.
///
/// `completed_files + failed_files <= total_files` holds in every snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CopyProgress {
    pub completed_files: u64,
    pub failed_files: u64,
    /// Files abandoned because of cancellation.
    pub skipped_files: u64,
    pub completed_bytes: u64,
    pub total_files: u64,
    pub total_bytes: u64,
    /// Most recently started file. Advisory; may already be finished.
    pub current_file: Option<PathBuf>,
    pub files_per_sec: f64,
    pub bytes_per_sec: f64,
    pub elapsed: Duration,
    /// `None` while throughput is zero or when nothing remains.
    pub estimated_remaining: Option<Duration>,
}

impl CopyProgress {
    /// Files not yet completed, failed or skipped.
    pub fn remaining_files(&self) -> u64 {
        self.total_files
            .saturating_sub(self.completed_files + self.failed_files + self.skipped_files)
    }

    /// Calculate progress as a percentage (0.0 to 100.0) of files processed.
    pub fn percentage(&self) -> f64 {
        if self.total_files == 0 {
            100.0
        } else {
            let done = self.completed_files + self.failed_files + self.skipped_files;
            (done as f64 / self.total_files as f64) * 100.0
        }
    }
}

#[derive(Debug, Default)]
struct CopyTally {
    completed_files: u64,
    failed_files: u64,
    skipped_files: u64,
    completed_bytes: u64,
    total_files: u64,
    total_bytes: u64,
    current_file: Option<PathBuf>,
}

/// Shared tally for one copy run.
#[derive(Debug)]
pub(crate) struct CopyTracker {
    tally: Mutex<CopyTally>,
    started: Instant,
}

impl CopyTracker {
    pub(crate) fn new(total_files: u64, total_bytes: u64) -> Self {
        Self {
            tally: Mutex::new(CopyTally {
                total_files,
                total_bytes,
                ..CopyTally::default()
            }),
            started: Instant::now(),
        }
    }

    pub(crate) fn set_total_bytes(&self, total_bytes: u64) {
        self.tally.lock().total_bytes = total_bytes;
    }

    pub(crate) fn begin(&self, path: &Path) {
        self.tally.lock().current_file = Some(path.to_path_buf());
    }

    /// Account for one attempted file. Each outcome lands in exactly one counter.
    pub(crate) fn finish(&self, result: &CopyResult) {
        let mut tally = self.tally.lock();
        match result.outcome {
            CopyOutcome::Copied => {
                tally.completed_files += 1;
                tally.completed_bytes += result.bytes_copied;
            }
            CopyOutcome::Failed => tally.failed_files += 1,
            CopyOutcome::Canceled => tally.skipped_files += 1,
        }
    }

    /// Count every file that was never attempted as skipped.
    pub(crate) fn skip_unattempted(&self) {
        let mut tally = self.tally.lock();
        let attempted = tally.completed_files + tally.failed_files + tally.skipped_files;
        tally.skipped_files += tally.total_files.saturating_sub(attempted);
    }

    pub(crate) fn snapshot(&self) -> CopyProgress {
        let mut progress = {
            let tally = self.tally.lock();
            CopyProgress {
                completed_files: tally.completed_files,
                failed_files: tally.failed_files,
                skipped_files: tally.skipped_files,
                completed_bytes: tally.completed_bytes,
                total_files: tally.total_files,
                total_bytes: tally.total_bytes,
                current_file: tally.current_file.clone(),
                ..CopyProgress::default()
            }
        };
        progress.elapsed = self.started.elapsed();
        fill_rates(&mut progress);
        progress
    }
}

/// Derive throughput and ETA from the counters and `elapsed`.
fn fill_rates(progress: &mut CopyProgress) {
    progress.files_per_sec = telemetry::rate(progress.completed_files, progress.elapsed);
    progress.bytes_per_sec = telemetry::rate(progress.completed_bytes, progress.elapsed);

    let remaining = progress.remaining_files();
    progress.estimated_remaining = if progress.files_per_sec > 0.0 && remaining > 0 {
        Some(Duration::from_secs_f64(
            remaining as f64 / progress.files_per_sec,
        ))
    } else {
        None
    };
}
