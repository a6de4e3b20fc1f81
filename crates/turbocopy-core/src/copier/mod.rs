/// Copy engine — mirrors a scanned file list from a source root into a
/// target root on a pool of worker threads.
///
/// A run goes through three stages on its coordinator thread:
///
/// 1. **Skeleton** — every source directory is created under the target,
///    so empty directories survive even though only files are queued.
/// 2. **Copy** — workers drain a prefilled, fixed-length queue of paths,
///    each streaming files through its own reusable buffer.
/// 3. **Finish** — the progress monitor is stopped, a final snapshot is
///    published and every stream is closed.
///
/// Streams on the [`CopyHandle`]:
///
/// - `results_rx` — one [`CopyResult`] per attempted file. Blocking.
/// - `errors_rx` — per-file failures and skeleton errors. Blocking.
/// - `progress_rx` — advisory snapshots, dropped when full; the final one is
///   always delivered.
pub mod progress;
pub(crate) mod skeleton;
pub(crate) mod worker;

use crate::cancel::CancellationToken;
use crate::config::CopyConfig;
use crate::error::CopyError;
use crate::model::FileList;
use crate::telemetry;
use progress::{CopyProgress, CopyTracker};
use worker::CopyContext;

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// How an attempted file ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CopyOutcome {
    Copied,
    Failed,
    /// Stopped by cancellation; the target may be partially written.
    Canceled,
}

/// Result of one attempted file. Emitted exactly once per attempt.
#[derive(Debug, Clone)]
pub struct CopyResult {
    /// Source path.
    pub path: PathBuf,
    pub outcome: CopyOutcome,
    /// Cause of a `Failed` or `Canceled` outcome.
    pub error: Option<CopyError>,
    /// Bytes written to the target, including for failed or canceled files.
    pub bytes_copied: u64,
}

impl CopyResult {
    pub fn success(&self) -> bool {
        self.outcome == CopyOutcome::Copied
    }
}

/// Handle to a running or completed copy.
pub struct CopyHandle {
    pub results_rx: Receiver<CopyResult>,
    pub progress_rx: Receiver<CopyProgress>,
    pub errors_rx: Receiver<CopyError>,
    cancel: CancellationToken,
    thread: Option<thread::JoinHandle<CopyProgress>>,
}

impl CopyHandle {
    /// Request the copy to stop as soon as possible.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the copy to finish and return its final snapshot.
    ///
    /// Keep draining `results_rx` and `errors_rx` (or drop them) first,
    /// otherwise workers may be blocked on a full queue.
    pub fn wait(mut self) -> Result<CopyProgress, CopyError> {
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| CopyError::WorkerPanicked),
            None => Err(CopyError::WorkerPanicked),
        }
    }
}

/// Start copying `files` (paths under `source_root`) into `target_root`.
///
/// Fails with [`CopyError::RootsOverlap`] when one root contains the other,
/// since every target file would then alias or clobber a source file.
pub fn start_copy(
    files: FileList,
    source_root: PathBuf,
    target_root: PathBuf,
    config: &CopyConfig,
    cancel: CancellationToken,
) -> Result<CopyHandle, CopyError> {
    if roots_overlap(&source_root, &target_root) {
        return Err(CopyError::RootsOverlap {
            source_root,
            target_root,
        });
    }

    let depths = config.queue_depths;
    let (results_tx, results_rx) = bounded::<CopyResult>(depths.results.max(1));
    let (progress_tx, progress_rx) = bounded::<CopyProgress>(depths.progress.max(1));
    let (errors_tx, errors_rx) = bounded::<CopyError>(depths.errors.max(1));

    let ctx = CopyContext {
        source_root,
        target_root,
        buffer_size: config.buffer_size(),
        cancel: cancel.clone(),
        tracker: CopyTracker::new(files.len() as u64, files.total_bytes),
        results_tx,
        errors_tx,
    };
    let plan = RunPlan {
        workers: config.workers(),
        interval: config.tick_interval(),
        measure_total_bytes: config.measure_total_bytes && !files.sizes_collected,
    };
    let own_progress_rx = progress_rx.clone();

    let thread = thread::Builder::new()
        .name("turbocopy-copier".into())
        .spawn(move || {
            info!(
                "Copying {} files from {} to {} with {} workers",
                files.len(),
                ctx.source_root.display(),
                ctx.target_root.display(),
                plan.workers
            );
            let last = run_copy(ctx, files, plan, &progress_tx, &own_progress_rx);
            info!(
                "Copy finished: {} copied, {} failed, {} skipped, {} bytes in {:?}",
                last.completed_files,
                last.failed_files,
                last.skipped_files,
                last.completed_bytes,
                last.elapsed
            );
            last
        })
        .map_err(|e| CopyError::Spawn(Arc::new(e)))?;

    Ok(CopyHandle {
        results_rx,
        progress_rx,
        errors_rx,
        cancel,
        thread: Some(thread),
    })
}

/// Whether the two roots resolve to the same directory or one lies inside
/// the other. Symlinks and relative paths are resolved first; a target that
/// does not exist yet is resolved through its nearest existing ancestor.
pub fn roots_overlap(source_root: &Path, target_root: &Path) -> bool {
    let source = resolve(source_root);
    let target = resolve(target_root);
    target.starts_with(&source) || source.starts_with(&target)
}

fn resolve(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(canonical, |acc: PathBuf, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return absolute,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RunPlan {
    workers: usize,
    interval: Duration,
    measure_total_bytes: bool,
}

fn run_copy(
    ctx: CopyContext,
    files: FileList,
    plan: RunPlan,
    progress_tx: &Sender<CopyProgress>,
    progress_rx: &Receiver<CopyProgress>,
) -> CopyProgress {
    let (stop_tx, stop_rx) = bounded::<()>(0);
    // Fixed-length work queue: prefilled after the skeleton pass, then closed.
    let (jobs_tx, jobs_rx) = bounded::<PathBuf>(files.len().max(1));

    thread::scope(|s| {
        let ctx = &ctx;
        let stop_rx = &stop_rx;
        let jobs_rx = &jobs_rx;

        if let Err(e) = thread::Builder::new()
            .name("turbocopy-copy-monitor".into())
            .spawn_scoped(s, move || {
                telemetry::run_ticker(plan.interval, stop_rx, progress_tx, || ctx.tracker.snapshot())
            })
        {
            warn!("Copy progress monitor unavailable: {e}");
        }

        let skeleton =
            skeleton::replicate(&ctx.source_root, &ctx.target_root, plan.workers, &ctx.cancel);
        info!(
            "Created {} target directories ({} failures)",
            skeleton.dirs_created,
            skeleton.errors.len()
        );
        for err in skeleton.errors {
            warn!("{err}");
            let _ = ctx.errors_tx.send(err);
        }

        if plan.measure_total_bytes && !ctx.cancel.is_cancelled() {
            ctx.tracker
                .set_total_bytes(skeleton::measure_total_bytes(&files));
        }

        for record in files.records {
            let _ = jobs_tx.send(record.path);
        }
        drop(jobs_tx);

        let mut handles = Vec::with_capacity(plan.workers);
        for i in 0..plan.workers {
            match thread::Builder::new()
                .name(format!("turbocopy-copy-{i}"))
                .spawn_scoped(s, move || worker::run_worker(ctx, jobs_rx))
            {
                Ok(handle) => handles.push(handle),
                Err(e) => warn!("Failed to spawn copy worker {i}: {e}"),
            }
        }

        if handles.is_empty() {
            warn!("No copy workers could be spawned; copying on the coordinator thread");
            worker::run_worker(ctx, jobs_rx);
        }

        for handle in handles {
            if handle.join().is_err() {
                warn!("A copy worker panicked");
            }
        }

        drop(stop_tx);
    });

    if ctx.cancel.is_cancelled() {
        ctx.tracker.skip_unattempted();
        info!("Copy cancelled; partially written files are left in place");
    }

    let last = ctx.tracker.snapshot();
    telemetry::publish_final(progress_tx, progress_rx, last.clone());
    last
}
