/// Data model shared by the scan and copy phases.
///
/// Re-exports the file records handed from the scanner to the copy engine
/// and the human-readable formatting helpers.
pub mod record;
pub mod size;

pub use record::{FileList, FileRecord};
