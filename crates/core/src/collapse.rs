//! Removal of the drained prefix with `FALLOC_FL_COLLAPSE_RANGE`.
//!
//! A collapse must start at offset 0 and cover a whole number of
//! filesystem blocks, and it can never remove the entire file. The
//! arithmetic lives in [`plan_collapse`] so it can be checked without a
//! filesystem; [`collapse_start`] queries the geometry and issues the call.

use serde::Serialize;

use crate::error::CollapseError;
use crate::resource::{is_unsupported, Geometry, SpaceReclaim};

/// Result of one collapse attempt that did not fail fatally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CollapseOutcome {
    /// `bytes` were removed from the start of the file.
    Collapsed { bytes: u64 },
    /// The caller asked for zero bytes.
    NothingRequested,
    /// The file occupies a single block and cannot shrink further.
    AlreadyMinimal,
    /// The eligible byte count rounds down to less than one block.
    NothingEligible,
    /// The filesystem rejected the collapse with `EOPNOTSUPP`.
    Unsupported { attempted: u64 },
}

impl CollapseOutcome {
    /// Bytes actually removed from the file.
    pub fn bytes_collapsed(&self) -> u64 {
        match self {
            Self::Collapsed { bytes } => *bytes,
            _ => 0,
        }
    }
}

/// What [`collapse_start`] will do for a given request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapsePlan {
    /// Collapse `[0, len)`.
    Collapse { len: u64 },
    /// Nothing to do; report this outcome.
    Skip(CollapseOutcome),
}

/// Compute the block-aligned collapse length for `bytes_eligible`.
///
/// The length is rounded down to a multiple of the block size. If it would
/// cover every allocated block it is shortened by one block, so at least
/// one block always survives.
pub fn plan_collapse(bytes_eligible: u64, geometry: Geometry) -> CollapsePlan {
    if bytes_eligible == 0 {
        return CollapsePlan::Skip(CollapseOutcome::NothingRequested);
    }
    if geometry.allocated_blocks == 1 {
        return CollapsePlan::Skip(CollapseOutcome::AlreadyMinimal);
    }

    let block_size = geometry.block_size;
    let mut len = bytes_eligible - bytes_eligible % block_size;
    let mut len_blocks = len / block_size;

    if len_blocks >= geometry.allocated_blocks {
        len = len.saturating_sub(block_size);
        len_blocks = len_blocks.saturating_sub(1);
    }

    if len_blocks < 1 {
        return CollapsePlan::Skip(CollapseOutcome::NothingEligible);
    }

    CollapsePlan::Collapse { len }
}

/// Collapse the largest block-aligned prefix of `file` not exceeding
/// `bytes_eligible`.
///
/// `bytes_eligible` should be the byte count already drained from the
/// start of the file. Returns [`CollapseOutcome::Unsupported`] instead of
/// an error when the filesystem lacks collapse support.
pub fn collapse_start<F>(file: &F, bytes_eligible: u64) -> Result<CollapseOutcome, CollapseError>
where
    F: SpaceReclaim + ?Sized,
{
    if bytes_eligible == 0 {
        return Ok(CollapseOutcome::NothingRequested);
    }

    let geometry = Geometry::query(file).map_err(CollapseError::Geometry)?;

    let len = match plan_collapse(bytes_eligible, geometry) {
        CollapsePlan::Collapse { len } => len,
        CollapsePlan::Skip(outcome) => {
            tracing::info!(
                bytes_eligible,
                block_size = geometry.block_size,
                allocated_blocks = geometry.allocated_blocks,
                ?outcome,
                "Collapse skipped",
            );
            return Ok(outcome);
        }
    };

    match file.collapse(0, len) {
        Ok(()) => {
            tracing::info!(bytes = len, block_size = geometry.block_size, "Collapsed file start");
            Ok(CollapseOutcome::Collapsed { bytes: len })
        }
        Err(e) if is_unsupported(&e) => {
            tracing::warn!(attempted = len, "Filesystem does not support range collapse");
            Ok(CollapseOutcome::Unsupported { attempted: len })
        }
        Err(source) => Err(CollapseError::Collapse { len, source }),
    }
}
