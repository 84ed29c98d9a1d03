//! Error taxonomy for the engine.
//!
//! Every variant here is fatal for the operation that produced it.
//! Recognised non-fatal results (collapse unsupported, file already
//! minimal, nothing eligible) are typed outcomes instead, see
//! [`CollapseOutcome`](crate::collapse::CollapseOutcome) and
//! [`ProbeOutcome`](crate::probe::ProbeOutcome).

use std::io;
use std::path::PathBuf;

use crate::copier::DrainProgress;
use crate::finish::FinishAction;

/// Failure of the read/write/deallocate loop.
///
/// All variants except [`DrainError::InvalidBufferSize`] are raised after
/// the file may already have been punched, so each carries the progress
/// snapshot taken at the moment of failure.
#[derive(Debug, thiserror::Error)]
pub enum DrainError {
    #[error("Buffer size must be greater than zero")]
    InvalidBufferSize,

    #[error("Read failed after {} bytes: {source}", .progress.bytes_read)]
    Read {
        source: io::Error,
        progress: DrainProgress,
    },

    #[error("Write to sink failed after {} bytes: {source}", .progress.bytes_written)]
    Write {
        source: io::Error,
        progress: DrainProgress,
    },

    #[error("Short write: sink accepted {written} of {expected} bytes")]
    ShortWrite {
        expected: usize,
        written: usize,
        progress: DrainProgress,
    },

    #[error("Hole punch of {len} bytes at offset {offset} failed: {source}")]
    Deallocate {
        offset: u64,
        len: u64,
        source: io::Error,
        progress: DrainProgress,
    },
}

impl DrainError {
    /// Counters at the point of failure.
    ///
    /// Zero for [`DrainError::InvalidBufferSize`], which is raised before
    /// any I/O.
    pub fn progress(&self) -> DrainProgress {
        match self {
            Self::InvalidBufferSize => DrainProgress::default(),
            Self::Read { progress, .. }
            | Self::Write { progress, .. }
            | Self::ShortWrite { progress, .. }
            | Self::Deallocate { progress, .. } => *progress,
        }
    }

    /// Whether the target file was left untouched.
    pub fn file_untouched(&self) -> bool {
        self.progress().bytes_deallocated == 0
    }
}

/// Fatal failure while collapsing the start of a file.
#[derive(Debug, thiserror::Error)]
pub enum CollapseError {
    #[error("Cannot query filesystem geometry: {0}")]
    Geometry(#[source] io::Error),

    #[error("Collapse of {len} bytes failed: {source}")]
    Collapse { len: u64, source: io::Error },
}

/// Fatal failure of the collapse capability probe.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Cannot create probe file in {}: {source}", .dir.display())]
    CreateFile { dir: PathBuf, source: io::Error },

    #[error("Cannot query filesystem block size: {0}")]
    Geometry(#[source] io::Error),

    #[error("Cannot preallocate probe file: {0}")]
    Allocate(#[source] io::Error),

    #[error("Probe collapse failed: {0}")]
    Collapse(#[source] io::Error),

    #[error("Cannot remove probe file: {0}")]
    Cleanup(#[source] io::Error),
}

/// Failure of the end-of-run action. The drain itself completed.
#[derive(Debug, thiserror::Error)]
pub enum FinishError {
    #[error(transparent)]
    Collapse(#[from] CollapseError),

    #[error("{action} of {} failed: {source}", .path.display())]
    Io {
        action: FinishAction,
        path: PathBuf,
        source: io::Error,
    },
}
