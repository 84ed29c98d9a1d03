//! Drives one run: probe, or drain followed by the end-of-run action.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;

use punchdrain_core::{
    drain, finish, probe_collapse, CollapseOutcome, FinishAction, FinishOutcome, ProbeOutcome,
};

use crate::config::{Mode, RunConfig};
use crate::report::DrainReport;

/// Execute `config` and return the process exit code.
///
/// Recognised non-fatal outcomes (collapse unsupported, nothing to
/// collapse) are logged and still exit successfully. A probe that reports
/// no collapse support exits with failure.
pub fn run(config: &RunConfig) -> anyhow::Result<ExitCode> {
    match &config.mode {
        Mode::Probe => run_probe(&mut io::stdout().lock()),
        Mode::Drain {
            path,
            buffer_size,
            action,
        } => {
            let stdout = io::stdout();
            let mut sink = ChunkSink::new(stdout.lock());
            let report = run_drain(path, *buffer_size, *action, &mut sink)?;
            if config.report_json {
                eprintln!("{}", report.to_json().context("cannot render report")?);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Run the collapse probe in the working directory and print the verdict.
pub fn run_probe<W: Write>(out: &mut W) -> anyhow::Result<ExitCode> {
    let outcome = probe_collapse().context("collapse test could not run")?;
    let (verdict, code) = match outcome {
        ProbeOutcome::Supported => ("OK", ExitCode::SUCCESS),
        ProbeOutcome::Unsupported => ("FAIL", ExitCode::FAILURE),
    };
    writeln!(out, "Collapse test : {verdict}")?;
    Ok(code)
}

/// Drain the file at `path` into `sink` and apply `action`.
pub fn run_drain<W: Write + ?Sized>(
    path: &Path,
    buffer_size: usize,
    action: FinishAction,
    sink: &mut W,
) -> anyhow::Result<DrainReport> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .with_context(|| format!("{} untouched: cannot open", path.display()))?;

    tracing::info!(path = %path.display(), buffer_size, %action, "Draining file");

    let progress = drain(&mut file, sink, buffer_size).map_err(|e| {
        let state = if e.file_untouched() {
            "untouched"
        } else {
            "may have been modified"
        };
        anyhow::Error::new(e).context(format!("{} {state}", path.display()))
    })?;

    tracing::info!(
        bytes_written = progress.bytes_written,
        bytes_deallocated = progress.bytes_deallocated,
        "File drained",
    );

    let outcome = finish(file, path, action, progress.bytes_deallocated)
        .with_context(|| format!("{} dumped but {action} failed", path.display()))?;

    if let FinishOutcome::Collapsed { collapse } = outcome {
        log_collapse(path, collapse);
    }

    Ok(DrainReport {
        file: path.to_path_buf(),
        buffer_size,
        progress,
        finish: outcome,
    })
}

fn log_collapse(path: &Path, outcome: CollapseOutcome) {
    match outcome {
        CollapseOutcome::Collapsed { bytes } => {
            tracing::info!(path = %path.display(), bytes, "Drained blocks collapsed");
        }
        CollapseOutcome::Unsupported { attempted } => {
            tracing::warn!(
                path = %path.display(),
                attempted,
                "Filesystem cannot collapse; file left sparse at full size",
            );
        }
        other => {
            tracing::info!(path = %path.display(), outcome = ?other, "Nothing collapsed");
        }
    }
}

/// Sink adapter that hands every chunk to the inner writer in full.
///
/// The drain loop treats a short `write` as fatal. Stdout is line-buffered
/// and may legitimately accept part of a chunk, so this adapter completes
/// each chunk with `write_all` and only reports a short count on error.
pub struct ChunkSink<W> {
    inner: W,
}

impl<W: Write> ChunkSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for ChunkSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writer that accepts at most three bytes per call.
    struct Trickle(Vec<u8>);

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(3);
            self.0.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn chunk_sink_completes_partial_writes() {
        let mut sink = ChunkSink::new(Trickle(Vec::new()));

        let n = sink.write(b"hello world").expect("write");

        assert_eq!(n, 11);
        assert_eq!(sink.into_inner().0, b"hello world");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn probe_prints_a_verdict_line() {
        let mut out = Vec::new();

        let _code = run_probe(&mut out).expect("probe");

        let text = String::from_utf8(out).expect("utf8 verdict");
        assert!(
            text == "Collapse test : OK\n" || text == "Collapse test : FAIL\n",
            "unexpected verdict {text:?}"
        );
    }

    #[test]
    fn missing_file_is_reported_untouched() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("missing.bin");
        let mut sink = Vec::new();

        let err = run_drain(&path, 1024, FinishAction::Keep, &mut sink).unwrap_err();

        assert!(format!("{err:#}").contains("untouched"));
    }
}
