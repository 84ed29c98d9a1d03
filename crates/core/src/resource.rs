//! File-resource capabilities used by the engine.
//!
//! [`SpaceReclaim`] names the storage operations the engine needs from the
//! target file. On Linux they map onto `fallocate(2)`, `fstatfs(2)` and
//! `fstat(2)`; elsewhere every operation reports
//! [`io::ErrorKind::Unsupported`].

use std::fs::File;
use std::io;

/// Size of the unit `st_blocks` is counted in, regardless of filesystem.
pub const STAT_BLOCK_SIZE: u64 = 512;

/// Storage operations on an open file.
pub trait SpaceReclaim {
    /// Free the storage behind `[offset, offset + len)` without changing the
    /// logical file size. Reads of the range return zeros afterwards.
    fn deallocate(&self, offset: u64, len: u64) -> io::Result<()>;

    /// Remove `[offset, offset + len)` from the file, shifting the tail
    /// down and shrinking the logical size by `len`. Both arguments must be
    /// multiples of the filesystem block size.
    fn collapse(&self, offset: u64, len: u64) -> io::Result<()>;

    /// Reserve storage for `[offset, offset + len)`, growing the file if
    /// needed.
    fn allocate(&self, offset: u64, len: u64) -> io::Result<()>;

    /// Block size of the filesystem holding the file.
    fn block_size(&self) -> io::Result<u64>;

    /// Bytes of storage actually allocated to the file. Holes do not count.
    fn allocated_bytes(&self) -> io::Result<u64>;
}

/// Whether `err` means the filesystem or kernel does not implement the
/// requested operation.
pub fn is_unsupported(err: &io::Error) -> bool {
    #[cfg(unix)]
    if err.raw_os_error() == Some(libc::EOPNOTSUPP) {
        return true;
    }
    err.kind() == io::ErrorKind::Unsupported
}

/// Block geometry of a file, as seen by its filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub block_size: u64,
    /// Allocated storage expressed in filesystem blocks (rounded down).
    pub allocated_blocks: u64,
}

impl Geometry {
    /// Query block size and allocated block count for `file`.
    pub fn query<F: SpaceReclaim + ?Sized>(file: &F) -> io::Result<Self> {
        let block_size = file.block_size()?;
        if block_size == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "filesystem reported a zero block size",
            ));
        }
        let allocated_blocks = file.allocated_bytes()? / block_size;
        Ok(Self {
            block_size,
            allocated_blocks,
        })
    }
}

#[cfg(target_os = "linux")]
mod linux {
    use std::fs::File;
    use std::io;
    use std::mem::MaybeUninit;
    use std::os::fd::AsRawFd;
    use std::os::unix::fs::MetadataExt;

    use super::STAT_BLOCK_SIZE;

    fn to_off_t(value: u64) -> io::Result<libc::off_t> {
        libc::off_t::try_from(value).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{value} does not fit in off_t"),
            )
        })
    }

    pub(super) fn fallocate(file: &File, mode: libc::c_int, offset: u64, len: u64) -> io::Result<()> {
        let offset = to_off_t(offset)?;
        let len = to_off_t(len)?;

        // Safety: the descriptor is owned by `file` and stays open for the call.
        let ret = unsafe { libc::fallocate(file.as_raw_fd(), mode, offset, len) };
        if ret == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    pub(super) fn fs_block_size(file: &File) -> io::Result<u64> {
        let mut stat = MaybeUninit::<libc::statfs>::uninit();

        // Safety: fstatfs fills the struct on success and we only read it then.
        let ret = unsafe { libc::fstatfs(file.as_raw_fd(), stat.as_mut_ptr()) };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        let stat = unsafe { stat.assume_init() };

        #[allow(clippy::unnecessary_cast)]
        let bsize = stat.f_bsize as i64;
        u64::try_from(bsize).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("filesystem reported block size {bsize}"),
            )
        })
    }

    pub(super) fn allocated_bytes(file: &File) -> io::Result<u64> {
        Ok(file.metadata()?.blocks() * STAT_BLOCK_SIZE)
    }
}

#[cfg(target_os = "linux")]
impl SpaceReclaim for File {
    fn deallocate(&self, offset: u64, len: u64) -> io::Result<()> {
        // PUNCH_HOLE is only accepted together with KEEP_SIZE.
        linux::fallocate(
            self,
            libc::FALLOC_FL_PUNCH_HOLE | libc::FALLOC_FL_KEEP_SIZE,
            offset,
            len,
        )
    }

    fn collapse(&self, offset: u64, len: u64) -> io::Result<()> {
        linux::fallocate(self, libc::FALLOC_FL_COLLAPSE_RANGE, offset, len)
    }

    fn allocate(&self, offset: u64, len: u64) -> io::Result<()> {
        linux::fallocate(self, 0, offset, len)
    }

    fn block_size(&self) -> io::Result<u64> {
        linux::fs_block_size(self)
    }

    fn allocated_bytes(&self) -> io::Result<u64> {
        linux::allocated_bytes(self)
    }
}

#[cfg(not(target_os = "linux"))]
impl SpaceReclaim for File {
    fn deallocate(&self, _offset: u64, _len: u64) -> io::Result<()> {
        Err(unsupported("hole punching"))
    }

    fn collapse(&self, _offset: u64, _len: u64) -> io::Result<()> {
        Err(unsupported("range collapse"))
    }

    fn allocate(&self, _offset: u64, _len: u64) -> io::Result<()> {
        Err(unsupported("preallocation"))
    }

    fn block_size(&self) -> io::Result<u64> {
        Err(unsupported("filesystem block size query"))
    }

    fn allocated_bytes(&self) -> io::Result<u64> {
        Err(unsupported("allocated size query"))
    }
}

#[cfg(not(target_os = "linux"))]
fn unsupported(what: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("{what} is only implemented on Linux"),
    )
}
