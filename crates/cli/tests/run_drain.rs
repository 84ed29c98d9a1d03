//! End-to-end tests of a drain run through the driver.

#![cfg(target_os = "linux")]

use std::fs;
use std::path::PathBuf;

use assert_matches::assert_matches;

use punchdrain_cli::app::{run_drain, ChunkSink};
use punchdrain_core::{CollapseOutcome, FinishAction, FinishOutcome};

fn source_file(dir: &tempfile::TempDir, len: usize) -> (PathBuf, Vec<u8>) {
    let content: Vec<u8> = (0..len).map(|i| (i % 199) as u8).collect();
    let path = dir.path().join("big.log");
    fs::write(&path, &content).expect("write source");
    (path, content)
}

#[test]
fn keep_leaves_sparse_file_of_same_size() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let (path, content) = source_file(&dir, 100_000);
    let mut sink = ChunkSink::new(Vec::new());

    let report = run_drain(&path, 8192, FinishAction::Keep, &mut sink).expect("drain");

    assert_eq!(sink.into_inner(), content);
    assert_eq!(report.progress.bytes_written, 100_000);
    assert_eq!(report.finish, FinishOutcome::Kept);
    let after = fs::read(&path).expect("read back");
    assert_eq!(after.len(), content.len());
    assert!(after.iter().all(|&b| b == 0));
}

#[test]
fn truncate_leaves_empty_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let (path, content) = source_file(&dir, 50_000);
    let mut sink = Vec::new();

    let report = run_drain(&path, 4096, FinishAction::Truncate, &mut sink).expect("drain");

    assert_eq!(sink, content);
    assert_eq!(report.finish, FinishOutcome::Truncated);
    assert_eq!(fs::metadata(&path).expect("metadata").len(), 0);
}

#[test]
fn remove_deletes_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let (path, content) = source_file(&dir, 50_000);
    let mut sink = Vec::new();

    let report = run_drain(&path, 4096, FinishAction::Remove, &mut sink).expect("drain");

    assert_eq!(sink, content);
    assert_eq!(report.finish, FinishOutcome::Removed);
    assert!(!path.exists());
}

#[test]
fn collapse_never_fails_on_unsupported_filesystems() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let (path, content) = source_file(&dir, 200_000);
    let mut sink = Vec::new();

    let report = run_drain(&path, 32 * 1024, FinishAction::Collapse, &mut sink).expect("drain");

    assert_eq!(sink, content);
    assert_matches!(
        report.finish,
        FinishOutcome::Collapsed {
            collapse: CollapseOutcome::Collapsed { .. }
                | CollapseOutcome::Unsupported { .. }
                | CollapseOutcome::AlreadyMinimal
        }
    );
    let len = fs::metadata(&path).expect("metadata").len();
    assert_eq!(
        len,
        content.len() as u64 - report.finish.bytes_collapsed(),
        "logical size shrinks by exactly the collapsed bytes"
    );
}

#[test]
fn empty_file_drains_cleanly() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let (path, _) = source_file(&dir, 0);
    let mut sink = Vec::new();

    let report = run_drain(&path, 4096, FinishAction::Collapse, &mut sink).expect("drain");

    assert!(sink.is_empty());
    assert_eq!(report.progress.bytes_deallocated, 0);
    assert_eq!(
        report.finish,
        FinishOutcome::Collapsed {
            collapse: CollapseOutcome::NothingRequested
        }
    );
}
