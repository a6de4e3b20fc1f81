/// Run summary and failure reports.
///
/// A [`CopySummary`] captures one pipeline run: when it ran, whether it was
/// cancelled, the final scan and copy snapshots, and every failure. It
/// serialises to JSON, and its failure list can be written as CSV.
use crate::copier::progress::CopyProgress;
use crate::error::{CopyError, PipelineError, ScanError};
use crate::scanner::progress::ScanProgress;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Scan,
    Copy,
}

/// One failed directory or file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub phase: Phase,
    /// Empty when the failure is not about a specific path.
    pub path: String,
    pub error: String,
}

impl FailureRecord {
    pub fn from_scan(err: &ScanError) -> Self {
        Self {
            phase: Phase::Scan,
            path: display_path(err.path()),
            error: err.to_string(),
        }
    }

    pub fn from_copy(err: &CopyError) -> Self {
        Self {
            phase: Phase::Copy,
            path: display_path(err.path()),
            error: err.to_string(),
        }
    }
}

fn display_path(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string()).unwrap_or_default()
}

/// Everything worth keeping about one run.
#[derive(Debug, Clone, Serialize)]
pub struct CopySummary {
    pub source: PathBuf,
    pub target: PathBuf,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub status: RunStatus,
    pub scan: ScanProgress,
    pub scan_errors: u64,
    /// Default (all zero) when the copy phase never ran.
    pub copy: CopyProgress,
    pub copy_errors: u64,
    pub failures: Vec<FailureRecord>,
}

impl CopySummary {
    /// Completed with nothing failed or skipped.
    pub fn is_clean(&self) -> bool {
        self.status == RunStatus::Completed
            && self.scan_errors == 0
            && self.copy_errors == 0
            && self.copy.failed_files == 0
            && self.copy.skipped_files == 0
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_json<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(writer, self)
    }

    /// Write one CSV row per failure, with a `phase,path,error` header.
    pub fn write_failures_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        for failure in &self.failures {
            wtr.serialize(failure)?;
        }
        // An empty report still gets its header.
        if self.failures.is_empty() {
            wtr.write_record(["phase", "path", "error"])?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write the failure CSV to `path`.
    pub fn save_failures_csv(&self, path: &Path) -> Result<(), PipelineError> {
        let report_err = |message: String| PipelineError::Report {
            path: path.to_path_buf(),
            message,
        };
        let file = File::create(path).map_err(|e| report_err(e.to_string()))?;
        self.write_failures_csv(file)
            .map_err(|e| report_err(e.to_string()))
    }
}
