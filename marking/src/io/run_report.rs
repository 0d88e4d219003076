//! JSON summary of a finished run (`--report`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::core::types::{FinishReason, WorkerReport};

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub workers: Vec<WorkerReport>,
    pub failed_workers: Vec<usize>,
    pub total_exams: usize,
    /// Exams whose every slot was claimed.
    pub exams_completed: usize,
    pub final_cursor: usize,
    pub final_exam: PathBuf,
    pub final_rubric: String,
    pub finish: Option<FinishReason>,
    pub lock_acquisitions: u64,
}

/// Serialize `report` to pretty-printed JSON with trailing newline.
pub fn write_run_report(path: &Path, report: &RunReport) -> Result<()> {
    debug!(path = %path.display(), workers = report.workers.len(), "writing run report");
    let mut buf = serde_json::to_string_pretty(report).context("serialize run report")?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}
