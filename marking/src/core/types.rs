//! Shared deterministic types for the marking core.
//!
//! These types are the contract between workers, the event sinks that render
//! progress, and the run report. They carry no I/O handles.

use std::path::PathBuf;

use serde::Serialize;

/// Why the pool stopped handing out work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum FinishReason {
    /// The last exam was fully claimed and there was no next exam.
    Exhausted,
    /// The next exam's student number could not be extracted.
    UnreadableExam { exam: PathBuf },
}

/// Progress events emitted by the pool and its workers.
///
/// Decision-bearing events (`RubricChanged`, `SlotClaimed`, `ExamLoaded`,
/// `RunFinished`) are emitted while the coordinator lock is held, so a sink
/// observes them in lock order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkingEvent {
    PoolStarted {
        exam: PathBuf,
        student_id: u32,
        total_exams: usize,
    },
    ReviewStarted {
        ta: usize,
        student_id: u32,
    },
    RubricChanged {
        ta: usize,
        slot: usize,
        from: char,
        to: char,
    },
    SlotClaimed {
        ta: usize,
        student_id: u32,
        slot: usize,
    },
    SlotMarked {
        ta: usize,
        student_id: u32,
        slot: usize,
    },
    ExamFullyClaimed {
        ta: usize,
        student_id: u32,
    },
    ExamLoaded {
        ta: usize,
        cursor: usize,
        exam: PathBuf,
        student_id: u32,
    },
    RunFinished {
        ta: usize,
        reason: FinishReason,
    },
    WorkerExited {
        ta: usize,
    },
    PoolFinished {
        workers: usize,
    },
}

/// Per-worker tally returned when a worker leaves its loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    pub ta: usize,
    pub slots_marked: usize,
    pub rubric_edits: usize,
    pub exams_advanced: usize,
    pub backoffs: usize,
}
