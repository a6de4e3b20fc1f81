/// Scan worker loop — one of these runs on every scan thread.
///
/// Each worker pops a directory, lists it, emits a `FileRecord` for every
/// non-directory entry and registers every subdirectory with the shared
/// `DirQueue`. Subdirectories that do not fit in the queue stay in the
/// worker's own backlog and are processed depth-first by that worker.
///
/// Every popped or backlogged directory is completed exactly once, including
/// after cancellation (the directory is then skipped without listing) and
/// during a panic unwind, so the pending-count always reaches zero and the
/// other workers are released.
use crate::cancel::CancellationToken;
use crate::error::ScanError;
use crate::model::FileRecord;
use crate::scanner::progress::ScanCounters;
use crate::scanner::queue::DirQueue;
use crossbeam_channel::Sender;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// State shared by all workers of one scan.
pub(crate) struct ScanContext {
    pub(crate) queue: DirQueue,
    pub(crate) counters: ScanCounters,
    pub(crate) cancel: CancellationToken,
    pub(crate) collect_sizes: bool,
    pub(crate) files_tx: Sender<FileRecord>,
    pub(crate) errors_tx: Sender<ScanError>,
}

impl ScanContext {
    /// Count and deliver a non-fatal error. Blocks if the error queue is full.
    fn report(&self, err: ScanError) {
        debug!("Scan error: {err}");
        self.counters.record_error();
        let _ = self.errors_tx.send(err);
    }
}

/// Directories this worker owns but has not completed yet.
struct Backlog<'a> {
    queue: &'a DirQueue,
    dirs: Vec<PathBuf>,
}

impl Drop for Backlog<'_> {
    fn drop(&mut self) {
        for _ in self.dirs.drain(..) {
            self.queue.complete();
        }
    }
}

/// Completes the in-flight directory when dropped.
struct InFlight<'a>(&'a DirQueue);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.complete();
    }
}

/// Drain the shared queue until the traversal is finished.
pub(crate) fn run_worker(ctx: &ScanContext) {
    let mut backlog = Backlog {
        queue: &ctx.queue,
        dirs: Vec::new(),
    };

    while let Some(dir) = ctx.queue.pop() {
        backlog.dirs.push(dir);
        while let Some(dir) = backlog.dirs.pop() {
            let _done = InFlight(&ctx.queue);
            if ctx.cancel.is_cancelled() {
                continue;
            }
            scan_dir(ctx, &dir, &mut backlog.dirs);
        }
    }
}

/// List one directory.
fn scan_dir(ctx: &ScanContext, dir: &Path, backlog: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            ctx.report(ScanError::read_dir(dir, err));
            return;
        }
    };

    for entry in entries {
        if ctx.cancel.is_cancelled() {
            return;
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                ctx.report(ScanError::read_dir(dir, err));
                continue;
            }
        };
        let path = entry.path();

        // `DirEntry::file_type` does not follow symlinks.
        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(err) => {
                ctx.report(ScanError::metadata(path, err));
                continue;
            }
        };

        if file_type.is_dir() {
            if let Err(overflow) = ctx.queue.push(path) {
                backlog.push(overflow);
            }
            continue;
        }

        let size = if ctx.collect_sizes {
            match fs::symlink_metadata(&path) {
                Ok(meta) => meta.len(),
                Err(err) => {
                    ctx.report(ScanError::metadata(path, err));
                    continue;
                }
            }
        } else {
            0
        };

        ctx.counters.record_file(size);
        let record = FileRecord {
            path,
            size,
            parent_dir: dir.to_path_buf(),
        };
        if ctx.files_tx.send(record).is_err() {
            // File consumer is gone; nothing more from this directory is useful.
            return;
        }
    }

    ctx.counters.record_dir();
}
