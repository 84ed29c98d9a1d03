//! Deallocating-copy engine.
//!
//! Drains a regular file into any [`std::io::Write`] sink while punching
//! holes behind the read cursor, then optionally reclaims the vacated
//! prefix at the end of the run. The modules are consumed by a driver in
//! this order:
//!
//! - [`copier`] -- the read/write/deallocate loop
//! - [`collapse`] -- block-aligned removal of the drained prefix
//! - [`probe`] -- runtime check for range-collapse support
//! - [`finish`] -- the driver-selected end-of-run action
//!
//! Filesystem operations go through the [`resource::SpaceReclaim`] trait so
//! the loop and the collapse arithmetic can be exercised without a real
//! filesystem.

pub mod collapse;
pub mod copier;
pub mod error;
pub mod finish;
pub mod probe;
pub mod resource;

pub use collapse::{collapse_start, CollapseOutcome};
pub use copier::{drain, DrainProgress, DEFAULT_BUFFER_SIZE};
pub use error::{CollapseError, DrainError, FinishError, ProbeError};
pub use finish::{finish, FinishAction, FinishOutcome};
pub use probe::{probe_collapse, probe_collapse_in, ProbeOutcome};
pub use resource::{is_unsupported, Geometry, SpaceReclaim};
