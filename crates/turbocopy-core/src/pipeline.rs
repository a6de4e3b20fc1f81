/// Scan-then-copy pipeline.
///
/// Runs both phases back to back under one cancellation token, forwarding
/// everything they report to a [`PipelineObserver`], and returns a
/// [`CopySummary`] for the whole run.
use crate::cancel::CancellationToken;
use crate::collector::{self, ScanEvent};
use crate::config::Config;
use crate::copier::progress::CopyProgress;
use crate::copier::{self, CopyResult};
use crate::error::{CopyError, PipelineError, ScanError};
use crate::report::{CopySummary, FailureRecord, RunStatus};
use crate::scanner::{self, progress::ScanProgress};
use chrono::Local;
use crossbeam_channel::{never, select};
use std::path::PathBuf;
use tracing::{info, warn};

enum CopyStream {
    Results,
    Progress,
    Errors,
}

/// Hooks for watching a pipeline run. Every method defaults to a no-op.
///
/// Hooks run on the thread that called [`Pipeline::run`], between queue
/// reads, so a slow hook delays draining but never loses data.
pub trait PipelineObserver {
    fn on_scan_progress(&mut self, _progress: &ScanProgress) {}
    fn on_scan_error(&mut self, _error: &ScanError) {}
    fn on_copy_progress(&mut self, _progress: &CopyProgress) {}
    fn on_copy_result(&mut self, _result: &CopyResult) {}
    fn on_copy_error(&mut self, _error: &CopyError) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl PipelineObserver for NullObserver {}

/// One source-to-target copy job.
pub struct Pipeline {
    source: PathBuf,
    target: PathBuf,
    config: Config,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the run; cancelling it from another thread ends the
    /// current phase early and skips any phase not yet started.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Scan the source, then copy everything found into the target.
    ///
    /// Per-file and per-directory failures do not fail the run; they are
    /// listed in the summary. An error is returned only when the source is
    /// unusable, the target overlaps it, or a phase could not be started.
    pub fn run<O: PipelineObserver>(&self, observer: &mut O) -> Result<CopySummary, PipelineError> {
        match std::fs::metadata(&self.source) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(PipelineError::SourceNotADirectory(self.source.clone())),
            Err(_) => return Err(PipelineError::SourceMissing(self.source.clone())),
        }
        // Copying a tree into itself would truncate sources as targets are created.
        if copier::roots_overlap(&self.source, &self.target) {
            return Err(PipelineError::TargetOverlapsSource {
                source_root: self.source.clone(),
                target_root: self.target.clone(),
            });
        }

        let started_at = Local::now();
        let mut failures = Vec::new();

        let handle = scanner::start_scan(self.source.clone(), &self.config.scan, self.cancel.clone())?;
        let scan = collector::collect(handle, self.config.scan.collect_file_sizes, |event| {
            match event {
                ScanEvent::Progress(progress) => observer.on_scan_progress(progress),
                ScanEvent::Error(err) => {
                    observer.on_scan_error(&err);
                    failures.push(FailureRecord::from_scan(&err));
                }
            }
        })?;
        // The collector's callback only ever sees snapshots that made it into
        // the queue; make sure the observer ends on the real final one.
        observer.on_scan_progress(&scan.final_progress);

        let mut copy = CopyProgress::default();
        let mut copy_errors = 0u64;

        if scan.cancelled || self.cancel.is_cancelled() {
            info!("Skipping copy phase: run was cancelled during the scan");
        } else {
            let handle = copier::start_copy(
                scan.files,
                self.source.clone(),
                self.target.clone(),
                &self.config.copy,
                self.cancel.clone(),
            )?;

            let mut results_rx = handle.results_rx.clone();
            let mut progress_rx = handle.progress_rx.clone();
            let mut errors_rx = handle.errors_rx.clone();
            let mut open = 3;

            while open > 0 {
                let closed = select! {
                    recv(results_rx) -> msg => match msg {
                        Ok(result) => {
                            observer.on_copy_result(&result);
                            None
                        }
                        Err(_) => Some(CopyStream::Results),
                    },
                    recv(progress_rx) -> msg => match msg {
                        Ok(progress) => {
                            observer.on_copy_progress(&progress);
                            None
                        }
                        Err(_) => Some(CopyStream::Progress),
                    },
                    recv(errors_rx) -> msg => match msg {
                        Ok(err) => {
                            copy_errors += 1;
                            observer.on_copy_error(&err);
                            failures.push(FailureRecord::from_copy(&err));
                            None
                        }
                        Err(_) => Some(CopyStream::Errors),
                    },
                };

                match closed {
                    Some(CopyStream::Results) => results_rx = never(),
                    Some(CopyStream::Progress) => progress_rx = never(),
                    Some(CopyStream::Errors) => errors_rx = never(),
                    None => continue,
                }
                open -= 1;
            }

            copy = handle.wait()?;
            observer.on_copy_progress(&copy);
        }

        let status = if self.cancel.is_cancelled() {
            RunStatus::Cancelled
        } else {
            RunStatus::Completed
        };
        if !failures.is_empty() {
            warn!("{} failures recorded during the run", failures.len());
        }

        Ok(CopySummary {
            source: self.source.clone(),
            target: self.target.clone(),
            started_at,
            finished_at: Local::now(),
            status,
            scan: scan.final_progress,
            scan_errors: scan.error_count,
            copy,
            copy_errors,
            failures,
        })
    }
}
