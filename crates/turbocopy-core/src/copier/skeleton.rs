/// Directory skeleton pre-pass.
///
/// Only files flow through the copy queue, so directories that contain no
/// files would never be created by the workers. Before any worker starts,
/// the source tree is walked once more (metadata only, via `jwalk`) and
/// every directory is created under the target root with `rayon`.
/// `create_dir_all` is idempotent, which makes the parallel creation safe
/// without ordering parents before children.
use crate::cancel::CancellationToken;
use crate::error::CopyError;
use crate::model::FileList;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Outcome of the pre-pass. Failures are non-fatal.
#[derive(Debug, Default)]
pub(crate) struct Skeleton {
    pub(crate) dirs_created: usize,
    pub(crate) errors: Vec<CopyError>,
}

/// Mirror every directory under `source_root` (including the root itself)
/// into `target_root`.
pub(crate) fn replicate(
    source_root: &Path,
    target_root: &Path,
    parallelism: usize,
    cancel: &CancellationToken,
) -> Skeleton {
    let mut skeleton = Skeleton::default();
    let mut dirs: Vec<PathBuf> = vec![target_root.to_path_buf()];

    let walker = jwalk::WalkDir::new(source_root)
        .skip_hidden(false)
        .follow_links(false)
        .sort(false)
        .parallelism(jwalk::Parallelism::RayonNewPool(parallelism.max(1)));

    for entry_result in walker {
        if cancel.is_cancelled() {
            debug!("Skeleton walk cancelled after {} directories", dirs.len());
            break;
        }

        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| source_root.to_path_buf());
                skeleton.errors.push(CopyError::Enumerate {
                    path,
                    message: err.to_string(),
                });
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }
        let path = entry.path();
        match path.strip_prefix(source_root) {
            Ok(rel) if rel.as_os_str().is_empty() => {}
            Ok(rel) => dirs.push(target_root.join(rel)),
            Err(_) => skeleton.errors.push(CopyError::OutsideRoot {
                path,
                root: source_root.to_path_buf(),
            }),
        }
    }

    let failures: Vec<CopyError> = dirs
        .par_iter()
        .filter_map(|dir| {
            fs::create_dir_all(dir)
                .err()
                .map(|e| CopyError::create_dir(dir.clone(), Arc::new(e)))
        })
        .collect();

    skeleton.dirs_created = dirs.len() - failures.len();
    skeleton.errors.extend(failures);
    skeleton
}

/// Sum the current on-disk size of every listed file. Unreadable files count as 0.
pub(crate) fn measure_total_bytes(files: &FileList) -> u64 {
    files
        .records
        .par_iter()
        .map(|record| fs::metadata(&record.path).map(|m| m.len()).unwrap_or(0))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn replicates_empty_directories() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let target = dst.path().join("out");
        fs::create_dir_all(src.path().join("a/b/c")).unwrap();
        fs::create_dir_all(src.path().join("empty")).unwrap();
        fs::write(src.path().join("a/file.txt"), "x").unwrap();

        let skeleton = replicate(src.path(), &target, 2, &CancellationToken::new());

        assert!(skeleton.errors.is_empty(), "{:?}", skeleton.errors);
        // target root + a + a/b + a/b/c + empty
        assert_eq!(skeleton.dirs_created, 5);
        assert!(target.join("a/b/c").is_dir());
        assert!(target.join("empty").is_dir());
        assert!(!target.join("a/file.txt").exists());
    }

    #[test]
    fn existing_target_directories_are_fine() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("x")).unwrap();
        fs::create_dir_all(dst.path().join("x")).unwrap();

        let skeleton = replicate(src.path(), dst.path(), 2, &CancellationToken::new());
        assert!(skeleton.errors.is_empty());
        assert!(dst.path().join("x").is_dir());
    }

    #[test]
    fn measures_sizes_on_disk() {
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("a"), vec![0u8; 10]).unwrap();
        fs::write(src.path().join("b"), vec![0u8; 32]).unwrap();
        let list: FileList = vec![src.path().join("a"), src.path().join("b"), src.path().join("gone")]
            .into_iter()
            .collect();

        assert_eq!(measure_total_bytes(&list), 42);
    }
}
