/// Tunables for the scan and copy phases.
///
/// Defaults are derived from the CPU count. A [`Config`] can be loaded from a
/// JSON file and then overridden per-field by `TURBOCOPY_*` environment
/// variables; unparsable overrides are ignored with a warning.
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Floor for the scan progress tick.
pub const MIN_SCAN_TICK_MS: u64 = 10;

/// Floor for the copy progress tick.
pub const MIN_COPY_TICK_MS: u64 = 100;

/// Conservative per-worker copy buffer before system tuning.
pub const BASE_COPY_BUFFER_BYTES: usize = 1024 * 1024;

/// Per-worker copy buffer chosen by [`CopyConfig::tuned_for_system`].
pub const TUNED_COPY_BUFFER_BYTES: usize = 4 * 1024 * 1024;

/// Capacities of the scanner's bounded queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanQueueDepths {
    /// Pending directory queue.
    pub directories: usize,
    /// Discovered file stream.
    pub files: usize,
    /// Progress snapshot stream.
    pub progress: usize,
    /// Error stream.
    pub errors: usize,
}

impl Default for ScanQueueDepths {
    fn default() -> Self {
        Self {
            directories: 1024,
            files: 1000,
            progress: 100,
            errors: 100,
        }
    }
}

/// Scan phase configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub worker_count: usize,
    pub tick_interval_ms: u64,
    /// Stat every file for its size. Off by default: listing alone is much
    /// faster than listing plus one `lstat` per file.
    pub collect_file_sizes: bool,
    pub queue_depths: ScanQueueDepths,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            worker_count: (num_cpus::get() * 4).max(8),
            tick_interval_ms: 500,
            collect_file_sizes: false,
            queue_depths: ScanQueueDepths::default(),
        }
    }
}

impl ScanConfig {
    /// Effective worker count (at least one).
    pub fn workers(&self) -> usize {
        self.worker_count.max(1)
    }

    /// Effective tick interval, clamped to [`MIN_SCAN_TICK_MS`].
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(MIN_SCAN_TICK_MS))
    }
}

/// Capacities of the copy engine's bounded output queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyQueueDepths {
    pub results: usize,
    pub progress: usize,
    pub errors: usize,
}

impl Default for CopyQueueDepths {
    fn default() -> Self {
        Self {
            results: 1000,
            progress: 100,
            errors: 100,
        }
    }
}

/// Copy phase configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyConfig {
    pub worker_count: usize,
    pub buffer_size_bytes: usize,
    pub tick_interval_ms: u64,
    /// When the scan did not collect sizes, stat every file before copying
    /// so progress can report a byte total.
    pub measure_total_bytes: bool,
    pub queue_depths: CopyQueueDepths,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self::tuned_for_system()
    }
}

impl CopyConfig {
    /// Untuned baseline: one worker per CPU (at most 8) and a 1 MiB buffer.
    pub fn baseline() -> Self {
        Self {
            worker_count: num_cpus::get().min(8),
            buffer_size_bytes: BASE_COPY_BUFFER_BYTES,
            tick_interval_ms: 500,
            measure_total_bytes: true,
            queue_depths: CopyQueueDepths::default(),
        }
    }

    /// Baseline adjusted for the host: twice the CPU count clamped to 4..=16
    /// workers, and a 4 MiB buffer per worker.
    pub fn tuned_for_system() -> Self {
        Self {
            worker_count: (num_cpus::get() * 2).clamp(4, 16),
            buffer_size_bytes: TUNED_COPY_BUFFER_BYTES,
            ..Self::baseline()
        }
    }

    pub fn workers(&self) -> usize {
        self.worker_count.max(1)
    }

    pub fn buffer_size(&self) -> usize {
        if self.buffer_size_bytes == 0 {
            BASE_COPY_BUFFER_BYTES
        } else {
            self.buffer_size_bytes
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(MIN_COPY_TICK_MS))
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub copy: CopyConfig,
}

/// Errors raised while loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Config {
    /// Load a JSON configuration file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply `TURBOCOPY_*` overrides looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let int = |key: &str| -> Option<u64> {
            let raw = lookup(key)?;
            match raw.trim().parse::<u64>() {
                Ok(n) => Some(n),
                Err(_) => {
                    warn!("Ignoring {key}={raw:?}: not a non-negative integer");
                    None
                }
            }
        };

        if let Some(n) = int("TURBOCOPY_SCAN_WORKERS") {
            self.scan.worker_count = n as usize;
        }
        if let Some(n) = int("TURBOCOPY_SCAN_TICK_MS") {
            self.scan.tick_interval_ms = n;
        }
        if let Some(raw) = lookup("TURBOCOPY_COLLECT_SIZES") {
            match parse_bool(&raw) {
                Some(b) => self.scan.collect_file_sizes = b,
                None => warn!("Ignoring TURBOCOPY_COLLECT_SIZES={raw:?}: not a boolean"),
            }
        }
        if let Some(n) = int("TURBOCOPY_SCAN_DIR_QUEUE") {
            self.scan.queue_depths.directories = n as usize;
        }
        if let Some(n) = int("TURBOCOPY_SCAN_FILE_QUEUE") {
            self.scan.queue_depths.files = n as usize;
        }
        if let Some(n) = int("TURBOCOPY_SCAN_PROGRESS_QUEUE") {
            self.scan.queue_depths.progress = n as usize;
        }
        if let Some(n) = int("TURBOCOPY_SCAN_ERROR_QUEUE") {
            self.scan.queue_depths.errors = n as usize;
        }
        if let Some(n) = int("TURBOCOPY_COPY_WORKERS") {
            self.copy.worker_count = n as usize;
        }
        if let Some(n) = int("TURBOCOPY_COPY_BUFFER_MB") {
            let bytes = usize::try_from(n)
                .ok()
                .and_then(|mb| mb.checked_mul(1024 * 1024))
                .filter(|&bytes| bytes > 0);
            match bytes {
                Some(bytes) => self.copy.buffer_size_bytes = bytes,
                None => warn!("Ignoring TURBOCOPY_COPY_BUFFER_MB={n}: out of range"),
            }
        }
        if let Some(n) = int("TURBOCOPY_COPY_TICK_MS") {
            self.copy.tick_interval_ms = n;
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "true" | "TRUE" | "True" | "yes" | "Y" | "y" => Some(true),
        "0" | "false" | "FALSE" | "False" | "no" | "N" | "n" => Some(false),
        _ => None,
    }
}
