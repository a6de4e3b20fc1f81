/// File records produced by the scanner and the collected list handed to the
/// copy engine.
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A discovered file. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// Path of the file, rooted at the scanned source directory.
    pub path: PathBuf,
    /// Size in bytes at scan time, or 0 when size collection is disabled.
    pub size: u64,
    /// Directory the file was listed from.
    pub parent_dir: PathBuf,
}

/// Materialised output of a scan, in discovery order.
///
/// `total_bytes` is the sum of sizes measured at scan time. If a file changes
/// between scan and copy, the copy phase reports what it actually transferred
/// and the two figures are not reconciled.
#[derive(Debug, Clone, Default)]
pub struct FileList {
    pub records: Vec<FileRecord>,
    pub total_bytes: u64,
    /// Whether `size` on each record (and therefore `total_bytes`) is meaningful.
    pub sizes_collected: bool,
}

impl FileList {
    pub fn new(sizes_collected: bool) -> Self {
        Self {
            records: Vec::new(),
            total_bytes: 0,
            sizes_collected,
        }
    }

    /// Append a record and account for its size.
    pub fn push(&mut self, record: FileRecord) {
        self.total_bytes += record.size;
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.records.iter().map(|r| r.path.as_path())
    }
}

impl FromIterator<PathBuf> for FileList {
    /// Build an unsized list from bare paths.
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        let mut list = FileList::new(false);
        for path in iter {
            let parent_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            list.push(FileRecord {
                path,
                size: 0,
                parent_dir,
            });
        }
        list
    }
}
