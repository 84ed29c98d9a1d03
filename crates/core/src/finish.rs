//! End-of-run reclamation.
//!
//! After a drain the file still has its full logical size, now made of
//! holes. The driver picks one of these actions to get rid of it.

use std::fmt;
use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::collapse::{collapse_start, CollapseOutcome};
use crate::error::FinishError;

/// End-of-run action. The actions are mutually exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishAction {
    /// Leave the sparse file in place.
    #[default]
    Keep,
    /// Collapse the drained blocks from the start of the file.
    Collapse,
    /// Truncate the file to zero bytes. Racy if another process appends.
    Truncate,
    /// Close and unlink the file. Racy if another process still uses it.
    Remove,
}

impl fmt::Display for FinishAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Keep => "keep",
            Self::Collapse => "collapse",
            Self::Truncate => "truncate",
            Self::Remove => "remove",
        })
    }
}

/// What the end-of-run action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FinishOutcome {
    Kept,
    Collapsed { collapse: CollapseOutcome },
    Truncated,
    Removed,
}

impl FinishOutcome {
    /// Bytes removed from the logical size by a collapse, 0 otherwise.
    pub fn bytes_collapsed(&self) -> u64 {
        match self {
            Self::Collapsed { collapse } => collapse.bytes_collapsed(),
            _ => 0,
        }
    }
}

/// Apply `action` to the drained file at `path`.
///
/// Takes ownership of `file` so [`FinishAction::Remove`] can close it
/// before unlinking. `bytes_deallocated` is the drain's counter and bounds
/// what a collapse may remove.
pub fn finish(
    file: File,
    path: &Path,
    action: FinishAction,
    bytes_deallocated: u64,
) -> Result<FinishOutcome, FinishError> {
    let io_err = |source| FinishError::Io {
        action,
        path: path.to_path_buf(),
        source,
    };

    let outcome = match action {
        FinishAction::Keep => FinishOutcome::Kept,
        FinishAction::Collapse => FinishOutcome::Collapsed {
            collapse: collapse_start(&file, bytes_deallocated)?,
        },
        FinishAction::Truncate => {
            file.set_len(0).map_err(io_err)?;
            FinishOutcome::Truncated
        }
        FinishAction::Remove => {
            // Drop ignores close(2) errors; surface write-back failures here.
            file.sync_all().map_err(io_err)?;
            drop(file);
            std::fs::remove_file(path).map_err(io_err)?;
            FinishOutcome::Removed
        }
    };

    tracing::info!(path = %path.display(), %action, ?outcome, "End-of-run action applied");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::fs::OpenOptions;
    use std::io::Write;

    use assert_matches::assert_matches;

    use super::*;

    fn scratch_file(dir: &Path, len: usize) -> (File, std::path::PathBuf) {
        let path = dir.join("drained.bin");
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .expect("create scratch file");
        file.write_all(&vec![7u8; len]).expect("fill scratch file");
        (file, path)
    }

    #[test]
    fn keep_leaves_file_untouched() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let (file, path) = scratch_file(dir.path(), 1000);

        let outcome = finish(file, &path, FinishAction::Keep, 1000).expect("keep");

        assert_eq!(outcome, FinishOutcome::Kept);
        assert_eq!(std::fs::metadata(&path).expect("metadata").len(), 1000);
    }

    #[test]
    fn truncate_empties_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let (file, path) = scratch_file(dir.path(), 1000);

        let outcome = finish(file, &path, FinishAction::Truncate, 1000).expect("truncate");

        assert_eq!(outcome, FinishOutcome::Truncated);
        assert_eq!(std::fs::metadata(&path).expect("metadata").len(), 0);
    }

    #[test]
    fn remove_unlinks_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let (file, path) = scratch_file(dir.path(), 10);

        let outcome = finish(file, &path, FinishAction::Remove, 10).expect("remove");

        assert_eq!(outcome, FinishOutcome::Removed);
        assert!(!path.exists());
    }

    #[test]
    fn remove_of_missing_path_names_action() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let (file, path) = scratch_file(dir.path(), 10);
        std::fs::remove_file(&path).expect("unlink early");

        let err = finish(file, &path, FinishAction::Remove, 10).unwrap_err();

        assert_matches!(err, FinishError::Io { action: FinishAction::Remove, .. });
        assert!(err.to_string().starts_with("remove of "));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn remove_reports_sync_failure_and_keeps_path() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let (_, path) = scratch_file(dir.path(), 10);
        // Character devices reject fsync with EINVAL.
        let device = OpenOptions::new()
            .write(true)
            .open("/dev/null")
            .expect("open /dev/null");

        let err = finish(device, &path, FinishAction::Remove, 10).unwrap_err();

        assert_matches!(err, FinishError::Io { action: FinishAction::Remove, .. });
        assert!(path.exists(), "unlink must not run after a failed sync");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn collapse_with_nothing_drained_is_nothing_requested() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let (file, path) = scratch_file(dir.path(), 10);

        let outcome = finish(file, &path, FinishAction::Collapse, 0).expect("collapse");

        assert_eq!(
            outcome,
            FinishOutcome::Collapsed {
                collapse: CollapseOutcome::NothingRequested
            }
        );
    }

    #[test]
    fn action_display_is_lowercase() {
        assert_eq!(FinishAction::Keep.to_string(), "keep");
        assert_eq!(FinishAction::Collapse.to_string(), "collapse");
        assert_eq!(FinishAction::Truncate.to_string(), "truncate");
        assert_eq!(FinishAction::Remove.to_string(), "remove");
    }
}
