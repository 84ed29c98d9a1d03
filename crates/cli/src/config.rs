//! Run configuration resolved from [`Args`].
//!
//! Environment variables are folded in by clap (`PUNCHDRAIN_BUFFER_SIZE`)
//! after `dotenvy` has loaded any `.env` file, so by the time a
//! [`RunConfig`] exists every value is validated.
//!
//! | Env Var                  | Default  |
//! |--------------------------|----------|
//! | `PUNCHDRAIN_BUFFER_SIZE` | `32KiB`  |
//! | `RUST_LOG`               | `punchdrain=info,punchdrain_core=info,punchdrain_cli=info` |

use std::path::PathBuf;

use punchdrain_core::FinishAction;

use crate::args::Args;

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Run the collapse capability probe in the working directory.
    Probe,
    /// Drain `path` and then apply `action`.
    Drain {
        path: PathBuf,
        buffer_size: usize,
        action: FinishAction,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub mode: Mode,
    pub report_json: bool,
}

impl RunConfig {
    /// Build the configuration from parsed arguments.
    ///
    /// Returns `None` when no file was given outside probe mode, which clap
    /// already rejects for parsed command lines.
    pub fn from_args(args: Args) -> Option<Self> {
        let mode = if args.collapse_test {
            Mode::Probe
        } else {
            let action = finish_action(&args);
            Mode::Drain {
                path: args.file?,
                buffer_size: args.buffer_size,
                action,
            }
        };

        Some(Self {
            mode,
            report_json: args.report_json,
        })
    }
}

fn finish_action(args: &Args) -> FinishAction {
    if args.collapse {
        FinishAction::Collapse
    } else if args.truncate {
        FinishAction::Truncate
    } else if args.remove {
        FinishAction::Remove
    } else {
        FinishAction::Keep
    }
}
