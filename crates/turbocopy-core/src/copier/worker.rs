/// Copy worker loop — streams whole files through one reusable buffer.
///
/// Cancellation is checked before taking each file and before each chunk.
/// A file interrupted mid-stream ends with a `Canceled` result and its
/// partially written target is left on disk; nothing is rolled back.
use crate::cancel::CancellationToken;
use crate::copier::progress::CopyTracker;
use crate::copier::{CopyOutcome, CopyResult};
use crate::error::CopyError;
use crossbeam_channel::{Receiver, Sender};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// State shared by all copy workers of one run.
pub(crate) struct CopyContext {
    pub(crate) source_root: PathBuf,
    pub(crate) target_root: PathBuf,
    pub(crate) buffer_size: usize,
    pub(crate) cancel: CancellationToken,
    pub(crate) tracker: CopyTracker,
    pub(crate) results_tx: Sender<CopyResult>,
    pub(crate) errors_tx: Sender<CopyError>,
}

impl CopyContext {
    /// Where `src` lands under the target root.
    pub(crate) fn target_for(&self, src: &Path) -> Result<PathBuf, CopyError> {
        let rel = src
            .strip_prefix(&self.source_root)
            .map_err(|_| CopyError::OutsideRoot {
                path: src.to_path_buf(),
                root: self.source_root.clone(),
            })?;
        Ok(self.target_root.join(rel))
    }
}

/// Take files from `jobs` until it is empty or cancellation is requested.
pub(crate) fn run_worker(ctx: &CopyContext, jobs: &Receiver<PathBuf>) {
    let mut buffer = vec![0u8; ctx.buffer_size];

    while !ctx.cancel.is_cancelled() {
        let Ok(src) = jobs.try_recv() else {
            break;
        };

        ctx.tracker.begin(&src);
        let result = copy_file(ctx, src, &mut buffer);
        ctx.tracker.finish(&result);

        if result.outcome == CopyOutcome::Failed {
            if let Some(err) = &result.error {
                debug!("Copy failed: {err}");
                let _ = ctx.errors_tx.send(err.clone());
            }
        }
        let _ = ctx.results_tx.send(result);
    }
}

/// Copy one file and describe how it went.
fn copy_file(ctx: &CopyContext, src: PathBuf, buffer: &mut [u8]) -> CopyResult {
    let mut written = 0u64;
    match transfer(ctx, &src, buffer, &mut written) {
        Ok(()) => CopyResult {
            path: src,
            outcome: CopyOutcome::Copied,
            error: None,
            bytes_copied: written,
        },
        Err(err) => CopyResult {
            path: src,
            outcome: if err.is_canceled() {
                CopyOutcome::Canceled
            } else {
                CopyOutcome::Failed
            },
            error: Some(err),
            bytes_copied: written,
        },
    }
}

fn transfer(
    ctx: &CopyContext,
    src: &Path,
    buffer: &mut [u8],
    written: &mut u64,
) -> Result<(), CopyError> {
    let dst = ctx.target_for(src)?;

    // The skeleton pass normally created this already; this is a cheap no-op then.
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| CopyError::io(CopyError::create_dir, parent, e))?;
    }

    let meta = fs::metadata(src).map_err(|e| CopyError::io(CopyError::metadata, src, e))?;
    if meta.is_dir() {
        // A symlink to a directory was listed as a file; its contents are not followed.
        return Err(CopyError::io(
            CopyError::open,
            src,
            io::Error::new(io::ErrorKind::InvalidInput, "source is a directory"),
        ));
    }

    let mut reader = File::open(src).map_err(|e| CopyError::io(CopyError::open, src, e))?;
    let mut writer = File::create(&dst).map_err(|e| CopyError::io(CopyError::create, &dst, e))?;

    loop {
        if ctx.cancel.is_cancelled() {
            return Err(CopyError::Canceled {
                path: src.to_path_buf(),
            });
        }
        let n = match reader.read(buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CopyError::io(CopyError::read, src, e)),
        };
        writer
            .write_all(&buffer[..n])
            .map_err(|e| CopyError::io(CopyError::write, &dst, e))?;
        *written += n as u64;
    }

    writer
        .flush()
        .map_err(|e| CopyError::io(CopyError::write, &dst, e))?;
    Ok(())
}
