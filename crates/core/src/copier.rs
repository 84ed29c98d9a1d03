//! The deallocating copy loop.
//!
//! [`drain`] reads the file from its current OS cursor, writes each chunk
//! to the sink and then punches a hole over the bytes just consumed. The
//! hole always starts at the running deallocated total, so the punched
//! region trails the read cursor and never runs ahead of it. Holes keep
//! the logical size and offsets of the file stable for any other process
//! that has it open.

use std::io::{self, Read, Write};

use serde::Serialize;

use crate::error::DrainError;
use crate::resource::SpaceReclaim;

/// Default chunk size (32 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// Cumulative counters of one drain session.
///
/// At every loop boundary `bytes_deallocated == bytes_written`. The two
/// only diverge inside a failed iteration, which is why the snapshot is
/// attached to every [`DrainError`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainProgress {
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub bytes_deallocated: u64,
}

/// Copy `file` into `sink` while deallocating the bytes already copied.
///
/// Each chunk is written with a single [`Write::write`] call and flushed
/// before its range is punched. A short write is fatal: the file has
/// already been mutated and a retry could duplicate or skip bytes.
///
/// Reads that fail with [`io::ErrorKind::Interrupted`] carry no data and
/// are re-issued; every other error aborts the session. Errors are logged
/// with the progress counters before they are returned.
pub fn drain<F, W>(file: &mut F, sink: &mut W, buffer_size: usize) -> Result<DrainProgress, DrainError>
where
    F: Read + SpaceReclaim + ?Sized,
    W: Write + ?Sized,
{
    if buffer_size == 0 {
        return Err(DrainError::InvalidBufferSize);
    }

    let mut buffer = vec![0u8; buffer_size];
    let mut progress = DrainProgress::default();

    loop {
        let nb_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => return Err(abort(DrainError::Read { source, progress })),
        };
        progress.bytes_read += nb_read as u64;

        let nb_written = match sink.write(&buffer[..nb_read]) {
            Ok(n) => n,
            Err(source) => return Err(abort(DrainError::Write { source, progress })),
        };
        progress.bytes_written += nb_written as u64;

        if nb_written != nb_read {
            return Err(abort(DrainError::ShortWrite {
                expected: nb_read,
                written: nb_written,
                progress,
            }));
        }

        // The chunk must have left the sink before its source is freed.
        if let Err(source) = sink.flush() {
            return Err(abort(DrainError::Write { source, progress }));
        }

        let offset = progress.bytes_deallocated;
        let len = nb_read as u64;
        if let Err(source) = file.deallocate(offset, len) {
            return Err(abort(DrainError::Deallocate {
                offset,
                len,
                source,
                progress,
            }));
        }
        progress.bytes_deallocated += len;

        tracing::trace!(
            bytes_read = progress.bytes_read,
            bytes_deallocated = progress.bytes_deallocated,
            "Chunk drained",
        );
    }

    tracing::debug!(
        bytes_written = progress.bytes_written,
        bytes_deallocated = progress.bytes_deallocated,
        "Drain complete",
    );

    Ok(progress)
}

/// Log the counters of a failed session and hand the error back.
fn abort(err: DrainError) -> DrainError {
    let progress = err.progress();
    tracing::error!(
        bytes_read = progress.bytes_read,
        bytes_written = progress.bytes_written,
        bytes_deallocated = progress.bytes_deallocated,
        error = %err,
        "Drain aborted",
    );
    err
}
