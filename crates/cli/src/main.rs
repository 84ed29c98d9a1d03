//! `punchdrain` -- dump a file on stdout while deallocating it.
//!
//! Reads FILE chunk by chunk, writes each chunk to stdout and punches a
//! hole over it, so piping a large file into a compressor or backup tool
//! needs no free space for a second copy. Optionally collapses, truncates
//! or removes FILE at the end.
//!
//! Logs go to stderr; stdout carries only the drained data (or the
//! collapse test verdict).
//!
//! # Environment variables
//!
//! | Variable                 | Required | Default | Description                  |
//! |--------------------------|----------|---------|------------------------------|
//! | `PUNCHDRAIN_BUFFER_SIZE` | no       | `32KiB` | Default for `--buffer-size`  |
//! | `RUST_LOG`               | no       | `punchdrain=info` | Log filter         |

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use punchdrain_cli::app;
use punchdrain_cli::args::Args;
use punchdrain_cli::config::RunConfig;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "punchdrain=info,punchdrain_core=info,punchdrain_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let Some(config) = RunConfig::from_args(args) else {
        tracing::error!("FILE is required unless --collapse-test is given");
        return ExitCode::FAILURE;
    };

    match app::run(&config) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "punchdrain failed");
            ExitCode::FAILURE
        }
    }
}
