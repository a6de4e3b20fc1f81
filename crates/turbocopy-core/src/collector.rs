/// File list collector — the handoff between the scan and copy phases.
///
/// Drains all three scan streams at once with `select!`. Draining them
/// together matters: the scanner blocks on a full error queue exactly as it
/// does on a full file queue, so a collector that only read files could
/// stall discovery behind unread errors.
use crate::error::ScanError;
use crate::model::FileList;
use crate::scanner::progress::ScanProgress;
use crate::scanner::ScanHandle;
use crossbeam_channel::{never, select};

enum Stream {
    Files,
    Progress,
    Errors,
}

/// Everything a finished scan produced.
#[derive(Debug)]
pub struct CollectedScan {
    /// Files in discovery order (not stable across runs).
    pub files: FileList,
    /// The scanner's last snapshot.
    pub final_progress: ScanProgress,
    pub error_count: u64,
    /// True if the scan was stopped early; `files` is then incomplete.
    pub cancelled: bool,
}

/// Something the scanner reported besides a file.
#[derive(Debug)]
pub enum ScanEvent<'a> {
    Progress(&'a ScanProgress),
    Error(ScanError),
}

/// Drain `handle` to completion.
///
/// `on_event` sees every snapshot that reached the queue and every non-fatal
/// scan error. `sizes_collected` is recorded on the list so the copy engine
/// knows whether `total_bytes` is meaningful.
pub fn collect<F>(
    handle: ScanHandle,
    sizes_collected: bool,
    mut on_event: F,
) -> Result<CollectedScan, ScanError>
where
    F: FnMut(ScanEvent<'_>),
{
    let mut files = FileList::new(sizes_collected);
    let mut error_count = 0u64;

    let mut files_rx = handle.files_rx.clone();
    let mut progress_rx = handle.progress_rx.clone();
    let mut errors_rx = handle.errors_rx.clone();
    let mut open = 3;

    while open > 0 {
        let closed = select! {
            recv(files_rx) -> msg => match msg {
                Ok(record) => {
                    files.push(record);
                    None
                }
                Err(_) => Some(Stream::Files),
            },
            recv(progress_rx) -> msg => match msg {
                Ok(progress) => {
                    on_event(ScanEvent::Progress(&progress));
                    None
                }
                Err(_) => Some(Stream::Progress),
            },
            recv(errors_rx) -> msg => match msg {
                Ok(err) => {
                    error_count += 1;
                    on_event(ScanEvent::Error(err));
                    None
                }
                Err(_) => Some(Stream::Errors),
            },
        };

        // A disconnected receiver is always ready; park it on `never()`.
        match closed {
            Some(Stream::Files) => files_rx = never(),
            Some(Stream::Progress) => progress_rx = never(),
            Some(Stream::Errors) => errors_rx = never(),
            None => continue,
        }
        open -= 1;
    }

    let cancelled = handle.is_cancelled();
    let final_progress = handle.wait()?;

    Ok(CollectedScan {
        files,
        final_progress,
        error_count,
        cancelled,
    })
}
