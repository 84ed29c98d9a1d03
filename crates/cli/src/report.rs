//! JSON summary printed with `--report-json`.

use std::path::PathBuf;

use serde::Serialize;

use punchdrain_core::{DrainProgress, FinishOutcome};

#[derive(Debug, Clone, Serialize)]
pub struct DrainReport {
    pub file: PathBuf,
    pub buffer_size: usize,
    #[serde(flatten)]
    pub progress: DrainProgress,
    pub finish: FinishOutcome,
}

impl DrainReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
