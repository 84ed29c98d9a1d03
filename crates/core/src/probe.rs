//! Runtime check for range-collapse support.
//!
//! Collapse support depends on the filesystem and kernel version (ext4
//! gained it in Linux 3.15, tmpfs and btrfs lack it). The probe tries a
//! one-block collapse on a disposable file so a real, already drained
//! target is never the first thing to find out.

use std::path::Path;

use crate::error::ProbeError;
use crate::resource::{is_unsupported, SpaceReclaim};

/// Name prefix of the disposable probe file.
pub const PROBE_FILE_PREFIX: &str = "punchdrain-collapse-probe-";

/// Whether the filesystem accepted a range collapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Supported,
    Unsupported,
}

/// Probe the filesystem of the current working directory.
pub fn probe_collapse() -> Result<ProbeOutcome, ProbeError> {
    probe_collapse_in(Path::new("."))
}

/// Probe the filesystem holding `dir`.
///
/// Creates a two-block file in `dir`, collapses its first block and removes
/// the file again. The file is removed on every exit path.
pub fn probe_collapse_in(dir: &Path) -> Result<ProbeOutcome, ProbeError> {
    let probe = tempfile::Builder::new()
        .prefix(PROBE_FILE_PREFIX)
        .tempfile_in(dir)
        .map_err(|source| ProbeError::CreateFile {
            dir: dir.to_path_buf(),
            source,
        })?;

    let file = probe.as_file();
    let block_size = file.block_size().map_err(ProbeError::Geometry)?;
    file.allocate(0, 2 * block_size).map_err(ProbeError::Allocate)?;

    let outcome = match file.collapse(0, block_size) {
        Ok(()) => ProbeOutcome::Supported,
        Err(e) if is_unsupported(&e) => ProbeOutcome::Unsupported,
        Err(e) => return Err(ProbeError::Collapse(e)),
    };

    probe.close().map_err(ProbeError::Cleanup)?;

    tracing::info!(dir = %dir.display(), block_size, ?outcome, "Collapse probe finished");
    Ok(outcome)
}
