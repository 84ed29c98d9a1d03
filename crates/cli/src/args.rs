//! Command-line arguments.

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use crate::size::parse_buffer_size;

/// Dump FILE on stdout and deallocate it at the same time.
///
/// Reads BYTES from FILE, writes them to stdout, punches a hole over them
/// (fallocate punch-hole) and starts again until the end of FILE.
///
/// Example: punchdrain big.log | gzip > small.gz
#[derive(Parser, Debug, Clone)]
#[command(name = "punchdrain", version)]
#[command(group(
    ArgGroup::new("end_of_run")
        .args(["collapse", "collapse_test", "truncate", "remove"])
        .multiple(false)
))]
pub struct Args {
    /// Regular file to drain. Opened read-write.
    #[arg(required_unless_present = "collapse_test", conflicts_with = "collapse_test")]
    pub file: Option<PathBuf>,

    /// Memory buffer size. Accepts KB/MB/.../EB (powers of 1000) and
    /// KiB/MiB/.../EiB (powers of 1024).
    #[arg(
        short,
        long,
        value_name = "BYTES",
        env = "PUNCHDRAIN_BUFFER_SIZE",
        default_value = "32KiB",
        value_parser = parse_buffer_size,
        allow_hyphen_values = true
    )]
    pub buffer_size: usize,

    /// At the end of the dump, collapse (fallocate collapse-range) the
    /// greatest number of filesystem blocks already dumped. Supported on
    /// ext4 from Linux 3.15.
    #[arg(short, long)]
    pub collapse: bool,

    /// Only test the collapse feature: create a temporary file in the
    /// working directory, try to collapse it and remove it.
    #[arg(short = 'C', long)]
    pub collapse_test: bool,

    /// Truncate FILE to size 0 at the end of the dump. Another process may
    /// write to FILE between the last read and the truncate.
    #[arg(short, long)]
    pub truncate: bool,

    /// Remove FILE at the end of the dump. Another process may still be
    /// using FILE.
    #[arg(short, long)]
    pub remove: bool,

    /// Print a JSON summary of the run to stderr.
    #[arg(long)]
    pub report_json: bool,
}
