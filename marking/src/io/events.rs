//! Event sinks for pool progress.
//!
//! The [`EventSink`] trait decouples workers from how progress is shown.
//! The console sink prints one line per event on stdout; tests use a
//! recording sink that keeps events in arrival order.

use std::io::Write;
use std::sync::Mutex;

use crate::core::types::{FinishReason, MarkingEvent};

/// Receiver of pool events. Shared by every worker thread.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &MarkingEvent);
}

/// Prints human-readable progress lines.
pub struct ConsoleSink<W: Write + Send> {
    out: Mutex<W>,
}

impl ConsoleSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> EventSink for ConsoleSink<W> {
    fn emit(&self, event: &MarkingEvent) {
        let line = render_event(event);
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Console output is best effort; a closed stdout must not stop marking.
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}

/// Render one event as a console line.
pub fn render_event(event: &MarkingEvent) -> String {
    match event {
        MarkingEvent::PoolStarted {
            exam,
            student_id,
            total_exams,
        } => format!(
            "Parent: loaded {} (student {:04}), {} exams total",
            exam.display(),
            student_id,
            total_exams
        ),
        MarkingEvent::ReviewStarted { ta, student_id } => {
            format!("TA {ta}: reviewing rubric for student {student_id:04}")
        }
        MarkingEvent::RubricChanged { ta, slot, from, to } => {
            format!("TA {ta}: rubric line {} changed {from} -> {to}", slot + 1)
        }
        MarkingEvent::SlotClaimed {
            ta,
            student_id,
            slot,
        } => format!("TA {ta}: marking student {student_id:04} q{}", slot + 1),
        MarkingEvent::SlotMarked {
            ta,
            student_id,
            slot,
        } => format!("TA {ta}: done marking student {student_id:04} q{}", slot + 1),
        MarkingEvent::ExamFullyClaimed { ta, student_id } => {
            format!("TA {ta}: all questions marked for student {student_id:04}")
        }
        MarkingEvent::ExamLoaded {
            ta,
            exam,
            student_id,
            ..
        } => format!(
            "TA {ta}: loaded next exam {} (student {student_id:04})",
            exam.display()
        ),
        MarkingEvent::RunFinished { ta, reason } => match reason {
            FinishReason::Exhausted => format!("TA {ta}: no more exams, marking finished"),
            FinishReason::UnreadableExam { exam } => format!(
                "TA {ta}: cannot read student number from {}, marking finished",
                exam.display()
            ),
        },
        MarkingEvent::WorkerExited { ta } => format!("TA {ta}: exiting"),
        MarkingEvent::PoolFinished { workers } => {
            format!("Parent: all TAs done ({workers} workers)")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn renders_worker_lines_with_padded_student_numbers() {
        let claimed = MarkingEvent::SlotClaimed {
            ta: 2,
            student_id: 42,
            slot: 2,
        };
        assert_eq!(render_event(&claimed), "TA 2: marking student 0042 q3");

        let changed = MarkingEvent::RubricChanged {
            ta: 1,
            slot: 0,
            from: 'Z',
            to: 'A',
        };
        assert_eq!(render_event(&changed), "TA 1: rubric line 1 changed Z -> A");
    }

    #[test]
    fn console_sink_writes_one_line_per_event() {
        let sink = ConsoleSink::new(Vec::new());
        sink.emit(&MarkingEvent::PoolStarted {
            exam: PathBuf::from("exams/exam1.txt"),
            student_id: 1,
            total_exams: 3,
        });
        sink.emit(&MarkingEvent::WorkerExited { ta: 3 });

        let written = String::from_utf8(sink.into_inner()).expect("utf8");
        assert_eq!(
            written,
            "Parent: loaded exams/exam1.txt (student 0001), 3 exams total\nTA 3: exiting\n"
        );
    }
}
