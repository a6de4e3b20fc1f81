/// Error types for the scan and copy phases.
///
/// Every per-directory and per-file failure is non-fatal: it is reported on
/// the relevant error stream and counted, and sibling work carries on. The
/// underlying `io::Error` is held in an `Arc` so the same error value can be
/// delivered both inside a `CopyResult` and on the error stream.
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Failures raised while discovering files.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScanError {
    /// A directory could not be listed; its subtree is skipped.
    #[error("failed to read directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    /// A file's size could not be read while size collection was enabled.
    #[error("failed to read metadata for {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    /// The scan coordinator thread could not be started.
    #[error("failed to spawn scanner thread: {0}")]
    Spawn(#[source] Arc<io::Error>),

    /// The scan coordinator thread panicked.
    #[error("scanner thread panicked")]
    WorkerPanicked,
}

impl ScanError {
    pub(crate) fn read_dir(path: impl Into<PathBuf>, err: io::Error) -> Self {
        Self::ReadDir {
            path: path.into(),
            source: Arc::new(err),
        }
    }

    pub(crate) fn metadata(path: impl Into<PathBuf>, err: io::Error) -> Self {
        Self::Metadata {
            path: path.into(),
            source: Arc::new(err),
        }
    }

    /// The directory or file the error is about, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::ReadDir { path, .. } | Self::Metadata { path, .. } => Some(path.as_path()),
            Self::Spawn(_) | Self::WorkerPanicked => None,
        }
    }
}

/// Failures raised while copying files.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CopyError {
    /// The file does not live under the source root.
    #[error("{} is not inside source root {}", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("failed to read metadata for {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("failed to open source file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("failed to create target file {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    /// Cancellation was observed mid-file. The target may be partially written.
    #[error("copy of {} was canceled", path.display())]
    Canceled { path: PathBuf },

    /// The directory skeleton walk hit an unreadable entry.
    #[error("failed to enumerate {}: {message}", path.display())]
    Enumerate { path: PathBuf, message: String },

    /// One root contains the other, so targets would alias sources.
    #[error(
        "target {} overlaps source {}",
        target_root.display(),
        source_root.display()
    )]
    RootsOverlap {
        source_root: PathBuf,
        target_root: PathBuf,
    },

    /// The copy coordinator thread could not be started.
    #[error("failed to spawn copy thread: {0}")]
    Spawn(#[source] Arc<io::Error>),

    /// The copy coordinator thread panicked.
    #[error("copy thread panicked")]
    WorkerPanicked,
}

impl CopyError {
    pub(crate) fn io(
        kind: fn(PathBuf, Arc<io::Error>) -> Self,
        path: impl Into<PathBuf>,
        err: io::Error,
    ) -> Self {
        kind(path.into(), Arc::new(err))
    }

    pub(crate) fn create_dir(path: PathBuf, source: Arc<io::Error>) -> Self {
        Self::CreateDir { path, source }
    }

    pub(crate) fn metadata(path: PathBuf, source: Arc<io::Error>) -> Self {
        Self::Metadata { path, source }
    }

    pub(crate) fn open(path: PathBuf, source: Arc<io::Error>) -> Self {
        Self::Open { path, source }
    }

    pub(crate) fn create(path: PathBuf, source: Arc<io::Error>) -> Self {
        Self::Create { path, source }
    }

    pub(crate) fn read(path: PathBuf, source: Arc<io::Error>) -> Self {
        Self::Read { path, source }
    }

    pub(crate) fn write(path: PathBuf, source: Arc<io::Error>) -> Self {
        Self::Write { path, source }
    }

    /// The file or directory the error is about, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::OutsideRoot { path, .. }
            | Self::CreateDir { path, .. }
            | Self::Metadata { path, .. }
            | Self::Open { path, .. }
            | Self::Create { path, .. }
            | Self::Read { path, .. }
            | Self::Write { path, .. }
            | Self::Canceled { path }
            | Self::Enumerate { path, .. } => Some(path.as_path()),
            Self::RootsOverlap { target_root, .. } => Some(target_root.as_path()),
            Self::Spawn(_) | Self::WorkerPanicked => None,
        }
    }

    /// Whether this error is the cancellation marker rather than a failure.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled { .. })
    }
}

/// Failures that stop the whole pipeline before or between phases.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("source directory does not exist: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("source is not a directory: {}", .0.display())]
    SourceNotADirectory(PathBuf),

    /// The target is the source, or one of them lies inside the other.
    #[error(
        "target {} overlaps source {}; choose a directory outside the source tree",
        target_root.display(),
        source_root.display()
    )]
    TargetOverlapsSource {
        source_root: PathBuf,
        target_root: PathBuf,
    },

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Copy(#[from] CopyError),

    /// Writing a summary or failure report failed.
    #[error("failed to write report {}: {message}", path.display())]
    Report { path: PathBuf, message: String },
}
