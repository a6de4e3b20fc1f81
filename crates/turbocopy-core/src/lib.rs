/// TurboCopy Core — parallel directory scanning and copying.
///
/// This crate holds all of the copy logic with no terminal or UI
/// dependencies. The `turbocopy` binary is a thin driver around
/// [`pipeline::Pipeline`].
///
/// # Modules
///
/// - [`scanner`] — Parallel discovery of every file under a root.
/// - [`collector`] — Drains a scan into a [`model::FileList`].
/// - [`copier`] — Parallel copy engine with a directory skeleton pre-pass.
/// - [`pipeline`] — Scan-then-copy driver with observer hooks.
/// - [`report`] — Run summary with JSON and CSV output.
/// - [`config`] — Tunables, JSON config files and environment overrides.
/// - [`model`] — File records and human-readable formatting helpers.
/// - [`cancel`] — Cooperative cancellation token shared by both phases.
/// - [`error`] — Error types for every phase.
pub mod cancel;
pub mod collector;
pub mod config;
pub mod copier;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod scanner;
mod telemetry;

pub use cancel::CancellationToken;
pub use config::{Config, CopyConfig, ScanConfig};
pub use error::{CopyError, PipelineError, ScanError};
pub use pipeline::{NullObserver, Pipeline, PipelineObserver};
pub use report::CopySummary;
