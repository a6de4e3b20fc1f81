/// Scanner module — parallel discovery of every file under a root directory.
///
/// A fixed pool of worker threads drains a bounded directory queue (see
/// [`queue`]) while a monitor thread samples lock-free counters into
/// periodic [`ScanProgress`] snapshots. Results leave through three bounded
/// streams on the [`ScanHandle`]:
///
/// - `files_rx` — every discovered file, exactly once. Workers block when it
///   is full: a dropped record would corrupt the file list.
/// - `errors_rx` — non-fatal listing/stat failures. Also blocking.
/// - `progress_rx` — advisory snapshots, dropped when the queue is full. The
///   final snapshot is always delivered.
///
/// All three streams disconnect when the scan is finished; that is the only
/// completion signal. Consumers must keep draining `files_rx` and
/// `errors_rx` until then (see [`crate::collector::collect`]).
pub mod progress;
pub(crate) mod queue;
pub(crate) mod worker;

use crate::cancel::CancellationToken;
use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::model::FileRecord;
use crate::telemetry;
use progress::{ScanCounters, ScanProgress};
use queue::DirQueue;
use worker::ScanContext;

use crossbeam_channel::{bounded, Receiver, Sender};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

/// Handle to a running or completed scan.
pub struct ScanHandle {
    /// Discovered files, in no particular order.
    pub files_rx: Receiver<FileRecord>,
    /// Periodic progress snapshots.
    pub progress_rx: Receiver<ScanProgress>,
    /// Non-fatal errors; the affected subtree or file is skipped.
    pub errors_rx: Receiver<ScanError>,
    cancel: CancellationToken,
    thread: Option<thread::JoinHandle<ScanProgress>>,
}

impl ScanHandle {
    /// Request the scan to stop as soon as possible.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the scan to finish and return its final snapshot.
    ///
    /// Only call this once `files_rx` and `errors_rx` are being drained (or
    /// have been dropped), otherwise workers may be blocked on a full queue.
    pub fn wait(mut self) -> Result<ScanProgress, ScanError> {
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| ScanError::WorkerPanicked),
            None => Err(ScanError::WorkerPanicked),
        }
    }
}

/// Start scanning `root` on a background thread.
///
/// `cancel` may be shared with a later copy phase so a single operator
/// action stops the whole pipeline.
pub fn start_scan(
    root: PathBuf,
    config: &ScanConfig,
    cancel: CancellationToken,
) -> Result<ScanHandle, ScanError> {
    let depths = config.queue_depths;
    let (files_tx, files_rx) = bounded::<FileRecord>(depths.files.max(1));
    let (progress_tx, progress_rx) = bounded::<ScanProgress>(depths.progress.max(1));
    let (errors_tx, errors_rx) = bounded::<ScanError>(depths.errors.max(1));

    let ctx = ScanContext {
        queue: DirQueue::seeded(root.clone(), depths.directories),
        counters: ScanCounters::new(config.collect_file_sizes),
        cancel: cancel.clone(),
        collect_sizes: config.collect_file_sizes,
        files_tx,
        errors_tx,
    };
    let workers = config.workers();
    let interval = config.tick_interval();
    let own_progress_rx = progress_rx.clone();

    let thread = thread::Builder::new()
        .name("turbocopy-scanner".into())
        .spawn(move || {
            info!(
                "Starting scan of {} with {workers} workers",
                root.display()
            );
            let last = run_scan(ctx, workers, interval, &progress_tx, &own_progress_rx);
            info!(
                "Scan of {} finished: {} files, {} directories, {} errors in {:?}",
                root.display(),
                last.files_seen,
                last.dirs_completed,
                last.errors,
                last.elapsed
            );
            last
        })
        .map_err(|e| ScanError::Spawn(Arc::new(e)))?;

    Ok(ScanHandle {
        files_rx,
        progress_rx,
        errors_rx,
        cancel,
        thread: Some(thread),
    })
}

/// Run the worker pool and monitor to completion; returns the final snapshot.
///
/// Consumes `ctx`, so the file and error senders are dropped (closing those
/// streams) before this returns. The progress sender is owned by the caller
/// and dropped when the coordinator thread exits.
fn run_scan(
    ctx: ScanContext,
    workers: usize,
    interval: std::time::Duration,
    progress_tx: &Sender<ScanProgress>,
    progress_rx: &Receiver<ScanProgress>,
) -> ScanProgress {
    let (stop_tx, stop_rx) = bounded::<()>(0);

    thread::scope(|s| {
        let ctx = &ctx;
        let stop_rx = &stop_rx;

        if let Err(e) = thread::Builder::new()
            .name("turbocopy-scan-monitor".into())
            .spawn_scoped(s, move || {
                telemetry::run_ticker(interval, stop_rx, progress_tx, || ctx.counters.snapshot())
            })
        {
            warn!("Scan progress monitor unavailable: {e}");
        }

        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers {
            match thread::Builder::new()
                .name(format!("turbocopy-scan-{i}"))
                .spawn_scoped(s, move || worker::run_worker(ctx))
            {
                Ok(handle) => handles.push(handle),
                Err(e) => warn!("Failed to spawn scan worker {i}: {e}"),
            }
        }

        if handles.is_empty() {
            warn!("No scan workers could be spawned; scanning on the coordinator thread");
            worker::run_worker(ctx);
        }

        for handle in handles {
            if handle.join().is_err() {
                warn!("A scan worker panicked");
            }
        }

        // Workers are done; release the monitor so the scope can end.
        drop(stop_tx);
    });

    if ctx.cancel.is_cancelled() {
        info!("Scan cancelled; file list is incomplete");
    }

    let last = ctx.counters.snapshot();
    telemetry::publish_final(progress_tx, progress_rx, last.clone());
    last
}
