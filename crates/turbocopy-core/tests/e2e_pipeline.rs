/// End-to-end pipeline tests: scan, copy and summary in one call.
use std::fs;
use std::path::Path;

use tempfile::TempDir;
use turbocopy_core::copier::progress::CopyProgress;
use turbocopy_core::copier::{CopyOutcome, CopyResult};
use turbocopy_core::report::RunStatus;
use turbocopy_core::scanner::progress::ScanProgress;
use turbocopy_core::{
    CancellationToken, Config, NullObserver, Pipeline, PipelineError, PipelineObserver,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    scan_snapshots: usize,
    copy_snapshots: Vec<CopyProgress>,
    results: usize,
    last_scan: Option<ScanProgress>,
}

impl PipelineObserver for Recorder {
    fn on_scan_progress(&mut self, progress: &ScanProgress) {
        self.scan_snapshots += 1;
        self.last_scan = Some(progress.clone());
    }

    fn on_copy_progress(&mut self, progress: &CopyProgress) {
        self.copy_snapshots.push(progress.clone());
    }

    fn on_copy_result(&mut self, _result: &CopyResult) {
        self.results += 1;
    }
}

/// Cancels the run as soon as the first file result arrives.
struct CancelAfterFirst {
    cancel: CancellationToken,
    results: Vec<CopyResult>,
}

impl PipelineObserver for CancelAfterFirst {
    fn on_copy_result(&mut self, result: &CopyResult) {
        self.cancel.cancel();
        self.results.push(result.clone());
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.scan.worker_count = 4;
    config.scan.tick_interval_ms = 10;
    config.copy.worker_count = 4;
    config.copy.buffer_size_bytes = 64;
    config
}

fn write(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn pipeline_copies_tree_and_summarises() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let target = dst.path().join("mirror");
    write(&src.path().join("x.txt"), b"abc");
    write(&src.path().join("sub/y.txt"), b"");
    write(&src.path().join("sub/deeper/z.bin"), &[9u8; 300]);
    fs::create_dir_all(src.path().join("sub/empty")).unwrap();

    let pipeline = Pipeline::new(src.path(), &target, test_config());
    let mut recorder = Recorder::default();
    let summary = pipeline.run(&mut recorder).unwrap();

    assert_eq!(summary.status, RunStatus::Completed);
    assert!(summary.is_clean(), "{:?}", summary.failures);
    assert_eq!(summary.scan.files_seen, 3);
    assert_eq!(summary.copy.completed_files, 3);
    assert_eq!(summary.copy.completed_bytes, 303);
    assert!(summary.finished_at >= summary.started_at);

    assert_eq!(fs::read(target.join("x.txt")).unwrap(), b"abc");
    assert_eq!(fs::read(target.join("sub/deeper/z.bin")).unwrap(), vec![9u8; 300]);
    assert!(target.join("sub/empty").is_dir());

    assert_eq!(recorder.results, 3);
    assert!(recorder.scan_snapshots >= 1);
    assert_eq!(recorder.last_scan.as_ref(), Some(&summary.scan));
    assert_eq!(recorder.copy_snapshots.last(), Some(&summary.copy));

    let json = summary.to_json_pretty().unwrap();
    assert!(json.contains("\"completed_files\": 3"));
}

#[test]
fn pipeline_records_copy_failures() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write(&src.path().join("ok.txt"), b"ok");
    write(&src.path().join("blocked/file.txt"), b"data");
    // A regular file where the skeleton needs a directory fails both the
    // directory and the file copied into it.
    write(&dst.path().join("blocked"), b"in the way");

    let summary = Pipeline::new(src.path(), dst.path(), test_config())
        .run(&mut NullObserver)
        .unwrap();

    assert_eq!(summary.status, RunStatus::Completed);
    assert!(!summary.is_clean());
    assert_eq!(summary.copy.completed_files, 1);
    assert_eq!(summary.copy.failed_files, 1);
    assert_eq!(summary.copy_errors, 2);
    assert_eq!(summary.failures.len(), 2);
    assert!(summary.failures.iter().all(|f| f.path.ends_with("blocked")));

    let mut csv = Vec::new();
    summary.write_failures_csv(&mut csv).unwrap();
    let csv = String::from_utf8(csv).unwrap();
    assert!(csv.starts_with("phase,path,error\n"));
    assert!(csv.contains("copy,"));
}

#[test]
fn pipeline_rejects_missing_source() {
    let tmp = TempDir::new().unwrap();
    let err = Pipeline::new(tmp.path().join("absent"), tmp.path().join("out"), test_config())
        .run(&mut NullObserver)
        .unwrap_err();
    assert!(matches!(err, PipelineError::SourceMissing(_)));
}

#[test]
fn pipeline_rejects_file_source() {
    let tmp = TempDir::new().unwrap();
    write(&tmp.path().join("plain.txt"), b"x");
    let err = Pipeline::new(tmp.path().join("plain.txt"), tmp.path().join("out"), test_config())
        .run(&mut NullObserver)
        .unwrap_err();
    assert!(matches!(err, PipelineError::SourceNotADirectory(_)));
}

#[test]
fn pipeline_cancelled_before_run_skips_copy() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let target = dst.path().join("never");
    write(&src.path().join("a.txt"), b"a");

    let pipeline = Pipeline::new(src.path(), &target, test_config());
    pipeline.cancel_token().cancel();
    let summary = pipeline.run(&mut NullObserver).unwrap();

    assert_eq!(summary.status, RunStatus::Cancelled);
    assert_eq!(summary.copy, CopyProgress::default());
    assert!(!target.exists());
    assert!(!summary.is_clean());
}

#[test]
fn pipeline_refuses_target_equal_to_source() {
    let src = TempDir::new().unwrap();
    write(&src.path().join("keep.txt"), b"precious data");

    let err = Pipeline::new(src.path(), src.path(), test_config())
        .run(&mut NullObserver)
        .unwrap_err();

    assert!(matches!(err, PipelineError::TargetOverlapsSource { .. }), "{err}");
    assert_eq!(fs::read(src.path().join("keep.txt")).unwrap(), b"precious data");
}

#[test]
fn pipeline_refuses_target_inside_source() {
    let src = TempDir::new().unwrap();
    write(&src.path().join("keep.txt"), b"precious data");
    let target = src.path().join("backup");

    let err = Pipeline::new(src.path(), &target, test_config())
        .run(&mut NullObserver)
        .unwrap_err();

    assert!(matches!(err, PipelineError::TargetOverlapsSource { .. }), "{err}");
    assert!(!target.exists());
    assert_eq!(fs::read(src.path().join("keep.txt")).unwrap(), b"precious data");
}

#[test]
fn pipeline_cancelled_mid_copy_accounts_for_every_file() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let target = dst.path().join("partial");
    for i in 0..200 {
        write(&src.path().join(format!("d{}/f{i:03}.bin", i % 4)), &vec![7u8; 64 * 1024]);
    }

    let mut config = test_config();
    // Workers block on the result stream until the observer has seen each one.
    config.copy.queue_depths.results = 1;
    let pipeline = Pipeline::new(src.path(), &target, config);
    let mut observer = CancelAfterFirst {
        cancel: pipeline.cancel_token(),
        results: Vec::new(),
    };
    let summary = pipeline.run(&mut observer).unwrap();

    assert_eq!(summary.status, RunStatus::Cancelled);
    assert!(!summary.is_clean());
    let copy = &summary.copy;
    assert_eq!(copy.total_files, 200);
    assert_eq!(copy.completed_files + copy.failed_files + copy.skipped_files, 200);
    assert!(copy.skipped_files > 0, "{copy:?}");

    let canceled: Vec<_> = observer
        .results
        .iter()
        .filter(|r| r.outcome == CopyOutcome::Canceled)
        .collect();
    assert_eq!(
        observer.results.len() as u64,
        copy.completed_files + copy.failed_files + canceled.len() as u64
    );
    // Interrupted files are left partially written.
    for result in canceled {
        let rel = result.path.strip_prefix(src.path()).unwrap();
        assert!(target.join(rel).is_file(), "{}", rel.display());
    }
}
