//! TurboCopy — parallel directory-tree copier.
//!
//! Thin binary entry point. All logic lives in the `turbocopy-core` crate.
//!
//! Usage: `turbocopy <source> <target>`
//!
//! Environment:
//! - `TURBOCOPY_CONFIG` — JSON config file loaded before any overrides.
//! - `TURBOCOPY_*` — per-setting overrides (see `turbocopy_core::config`).
//! - `TURBOCOPY_FAILURE_REPORT` — write failed paths to this CSV file.
//!
//! Ctrl-C cancels the run and still prints the summary; a second Ctrl-C
//! exits immediately.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use turbocopy_core::copier::progress::CopyProgress;
use turbocopy_core::model::size::{format_count, format_duration, format_rate, format_size};
use turbocopy_core::scanner::progress::ScanProgress;
use turbocopy_core::{Config, CopyError, Pipeline, PipelineObserver, ScanError};

const STATUS_INTERVAL: Duration = Duration::from_secs(1);

/// Prints at most one status line per second for each phase.
struct StatusPrinter {
    last_scan: Option<Instant>,
    last_copy: Option<Instant>,
}

impl StatusPrinter {
    fn new() -> Self {
        Self {
            last_scan: None,
            last_copy: None,
        }
    }

    fn due(last: &mut Option<Instant>) -> bool {
        let now = Instant::now();
        match last {
            Some(prev) if now.duration_since(*prev) < STATUS_INTERVAL => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

impl PipelineObserver for StatusPrinter {
    fn on_scan_progress(&mut self, p: &ScanProgress) {
        if !Self::due(&mut self.last_scan) {
            return;
        }
        let bytes = p
            .bytes_seen
            .map(|b| format!(", {}", format_size(b)))
            .unwrap_or_default();
        eprintln!(
            "scan: {} files{bytes}, {} dirs, {} errors, {:.0} files/s, {}",
            format_count(p.files_seen),
            format_count(p.dirs_completed),
            p.errors,
            p.files_per_sec,
            format_duration(p.elapsed)
        );
    }

    fn on_scan_error(&mut self, error: &ScanError) {
        tracing::warn!("{error}");
    }

    fn on_copy_progress(&mut self, p: &CopyProgress) {
        if !Self::due(&mut self.last_copy) {
            return;
        }
        let eta = p
            .estimated_remaining
            .map(format_duration)
            .unwrap_or_else(|| "--:--".into());
        eprintln!(
            "copy: {}/{} files ({:.1}%), {} failed, {} of {}, {}, eta {eta}",
            format_count(p.completed_files),
            format_count(p.total_files),
            p.percentage(),
            p.failed_files,
            format_size(p.completed_bytes),
            format_size(p.total_bytes),
            format_rate(p.bytes_per_sec),
        );
    }

    fn on_copy_error(&mut self, error: &CopyError) {
        tracing::warn!("{error}");
    }
}

fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr; stdout carries only the JSON summary.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args_os().skip(1);
    let (Some(source), Some(target), None) = (args.next(), args.next(), args.next()) else {
        bail!("usage: turbocopy <source> <target>");
    };
    let source = PathBuf::from(source);
    let target = PathBuf::from(target);

    let mut config = match std::env::var_os("TURBOCOPY_CONFIG") {
        Some(path) => {
            let path = PathBuf::from(path);
            Config::load(&path)
                .with_context(|| format!("loading config from {}", path.display()))?
        }
        None => Config::default(),
    };
    config.apply_overrides(|key| std::env::var(key).ok());

    tracing::info!("TurboCopy {} starting", env!("CARGO_PKG_VERSION"));

    let pipeline = Pipeline::new(&source, &target, config);
    let cancel = pipeline.cancel_token();
    ctrlc::set_handler(move || {
        if cancel.is_cancelled() {
            std::process::exit(130);
        }
        tracing::warn!("Interrupted; cancelling the run (Ctrl-C again to abort)");
        cancel.cancel();
    })
    .context("installing Ctrl-C handler")?;

    let mut printer = StatusPrinter::new();
    let summary = pipeline
        .run(&mut printer)
        .with_context(|| format!("copying {} to {}", source.display(), target.display()))?;

    let mut stdout = std::io::stdout().lock();
    summary.write_json(&mut stdout)?;
    writeln!(stdout)?;
    drop(stdout);

    if let Some(path) = std::env::var_os("TURBOCOPY_FAILURE_REPORT") {
        summary.save_failures_csv(&PathBuf::from(path))?;
    }

    if summary.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
