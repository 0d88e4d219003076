//! Test-only helpers: exam directory fixtures and a recording event sink.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::rubric::{Rubric, RubricEdit};
use crate::core::types::MarkingEvent;
use crate::io::config::{MarkingConfig, PacingConfig};
use crate::io::events::EventSink;

/// A temporary working directory with an `exams/` folder and a rubric path.
pub struct ExamFixture {
    temp: TempDir,
}

impl ExamFixture {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        fs::create_dir_all(temp.path().join("exams")).context("create exams dir")?;
        Ok(Self { temp })
    }

    /// Create `exam1.txt..examN.txt`, one per student number.
    pub fn with_exams(student_ids: &[u32]) -> Result<Self> {
        let fixture = Self::new()?;
        for (i, student_id) in student_ids.iter().enumerate() {
            fixture.write_exam(i + 1, &format!("{student_id:04}\nQ1.\nQ2.\n"))?;
        }
        Ok(fixture)
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn exams_dir(&self) -> PathBuf {
        self.root().join("exams")
    }

    pub fn rubric_path(&self) -> PathBuf {
        self.root().join("rubric.txt")
    }

    pub fn write_exam(&self, n: usize, contents: &str) -> Result<PathBuf> {
        let path = self.exams_dir().join(format!("exam{n}.txt"));
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    /// Default config pointed at this fixture, with no sleeping.
    pub fn config(&self) -> MarkingConfig {
        MarkingConfig {
            exams_dir: self.exams_dir(),
            rubric_path: self.rubric_path(),
            pacing: PacingConfig::instant(),
            ..MarkingConfig::default()
        }
    }
}

/// Keeps every event in arrival order.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<MarkingEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<MarkingEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &MarkingEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

/// Rubric edits in the order the sink saw them.
pub fn rubric_edits(events: &[MarkingEvent]) -> Vec<RubricEdit> {
    events
        .iter()
        .filter_map(|event| match event {
            MarkingEvent::RubricChanged { slot, from, to, .. } => Some(RubricEdit {
                slot: *slot,
                from: *from,
                to: *to,
            }),
            _ => None,
        })
        .collect()
}

/// Replay `edits` on `initial`; `None` if any edit does not start from the
/// grade it claims to have changed.
pub fn replay_edits(initial: &Rubric, edits: &[RubricEdit]) -> Option<Rubric> {
    let mut rubric = initial.clone();
    let consistent = edits.iter().all(|edit| rubric.replay(edit));
    consistent.then_some(rubric)
}
