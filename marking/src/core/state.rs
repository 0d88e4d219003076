//! The single record shared by every worker.
//!
//! `SharedState` is plain data: it performs no locking and no I/O. The
//! coordinator owns it behind its lock, and anything that needs a student
//! number for the next exam is passed in as a resolver.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

use crate::core::rubric::{Rubric, RubricEdit};
use crate::core::types::FinishReason;

/// Outcome of trying to move the cursor to the next exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Cursor moved and the marked flags were reset.
    Loaded {
        cursor: usize,
        exam: PathBuf,
        student_id: u32,
    },
    /// The pool is finished; `done` is now set.
    Finished(FinishReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedState {
    exams: Vec<PathBuf>,
    cursor: usize,
    current_student_id: u32,
    rubric: Rubric,
    marked: Vec<bool>,
    done: bool,
    finish: Option<FinishReason>,
}

impl SharedState {
    /// Build the initial state: cursor on the first exam, no slot marked,
    /// `done` cleared. One exercise slot per rubric grade.
    pub fn new(exams: Vec<PathBuf>, first_student_id: u32, rubric: Rubric) -> Result<Self> {
        if exams.is_empty() {
            return Err(anyhow!("shared state needs at least one exam"));
        }
        if rubric.is_empty() {
            return Err(anyhow!("shared state needs at least one exercise slot"));
        }
        let slots = rubric.len();
        Ok(Self {
            exams,
            cursor: 0,
            current_student_id: first_student_id,
            rubric,
            marked: vec![false; slots],
            done: false,
            finish: None,
        })
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn total_exams(&self) -> usize {
        self.exams.len()
    }

    pub fn current_student_id(&self) -> u32 {
        self.current_student_id
    }

    pub fn current_exam(&self) -> &Path {
        &self.exams[self.cursor]
    }

    pub fn exercises(&self) -> usize {
        self.marked.len()
    }

    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    pub fn marked(&self) -> &[bool] {
        &self.marked
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn finish_reason(&self) -> Option<&FinishReason> {
        self.finish.as_ref()
    }

    /// Advance the rubric grade at `slot` by one letter.
    pub fn correct_rubric(&mut self, slot: usize) -> Option<RubricEdit> {
        self.rubric.advance(slot)
    }

    /// Claim the first unmarked slot in slot order.
    ///
    /// Returns `None` once the pool is done, even if slots remain unmarked.
    pub fn claim_next_slot(&mut self) -> Option<usize> {
        if self.done {
            return None;
        }
        let slot = self.marked.iter().position(|marked| !marked)?;
        self.marked[slot] = true;
        Some(slot)
    }

    pub fn all_marked(&self) -> bool {
        self.marked.iter().all(|marked| *marked)
    }

    /// Move to the next exam, or finish the run.
    ///
    /// `resolve` reads the student number of the candidate exam. When there
    /// is no next exam, or `resolve` yields `None`, the run is finished and
    /// the cursor stays where it is.
    pub fn advance<F>(&mut self, resolve: F) -> Advance
    where
        F: FnOnce(&Path) -> Option<u32>,
    {
        if let Some(reason) = &self.finish {
            return Advance::Finished(reason.clone());
        }
        let next = self.cursor + 1;
        let Some(exam) = self.exams.get(next) else {
            return self.finish(FinishReason::Exhausted);
        };
        let Some(student_id) = resolve(exam) else {
            let exam = exam.clone();
            return self.finish(FinishReason::UnreadableExam { exam });
        };
        self.cursor = next;
        self.current_student_id = student_id;
        self.marked.fill(false);
        Advance::Loaded {
            cursor: next,
            exam: self.exams[next].clone(),
            student_id,
        }
    }

    /// Set `done`. The first reason recorded is kept.
    pub fn finish(&mut self, reason: FinishReason) -> Advance {
        self.done = true;
        let reason = self.finish.get_or_insert(reason).clone();
        Advance::Finished(reason)
    }
}
