//! The per-worker marking loop.
//!
//! Each pass: pause to read outside the lock, then under one lock acquisition
//! review the rubric and claim the next slot. Marking happens with the lock
//! released. When nothing is left to claim on the current exam, the worker
//! that notices advances the cursor, or finishes the run if it cannot.

use std::thread;
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use tracing::{debug, instrument, warn};

use crate::coordinator::{Coordinator, Session};
use crate::core::state::Advance;
use crate::core::types::{MarkingEvent, WorkerReport};
use crate::io::catalog::ExamCatalog;
use crate::io::config::PacingConfig;
use crate::io::events::EventSink;
use crate::io::rubric_store::RubricStore;

/// Everything a worker shares with the rest of the pool.
pub struct WorkerContext<'a, S: EventSink + ?Sized> {
    pub coordinator: &'a Coordinator,
    pub catalog: &'a ExamCatalog,
    pub rubric_store: &'a RubricStore,
    pub pacing: &'a PacingConfig,
    pub sink: &'a S,
}

/// What a pass decided while holding the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// A slot was claimed; mark it with the lock released.
    Marking { slot: usize, student_id: u32 },
    /// The cursor moved to the next exam; back off before the next review.
    Advanced,
    /// Nothing claimable yet; back off and retry.
    Waiting,
    /// The run is over.
    Exit,
}

/// Run worker `ta` until the pool is done.
///
/// Returns an error only when the coordinator is poisoned; every other
/// condition ends the loop through the shared `done` flag.
#[instrument(skip(ctx, rng))]
pub fn run_worker<S, R>(ta: usize, ctx: &WorkerContext<'_, S>, rng: &mut R) -> Result<WorkerReport>
where
    S: EventSink + ?Sized,
    R: Rng,
{
    let mut report = WorkerReport {
        ta,
        ..WorkerReport::default()
    };

    while !ctx.coordinator.is_done() {
        pause(rng, ctx.pacing.review_min_ms, ctx.pacing.review_max_ms);

        let mut session = ctx.coordinator.acquire(ta)?;
        let pass = review_and_claim(&mut session, ctx, rng, &mut report);
        session.release();

        match pass {
            Pass::Marking { slot, student_id } => {
                pause(rng, ctx.pacing.marking_min_ms, ctx.pacing.marking_max_ms);
                let session = ctx.coordinator.acquire(ta)?;
                ctx.sink.emit(&MarkingEvent::SlotMarked {
                    ta,
                    student_id,
                    slot,
                });
                session.release();
                report.slots_marked += 1;
            }
            Pass::Advanced => {
                report.exams_advanced += 1;
                thread::sleep(ctx.pacing.backoff());
            }
            Pass::Waiting => {
                report.backoffs += 1;
                thread::sleep(ctx.pacing.backoff());
            }
            Pass::Exit => break,
        }
    }

    debug!(
        slots_marked = report.slots_marked,
        rubric_edits = report.rubric_edits,
        "worker leaving loop"
    );
    ctx.sink.emit(&MarkingEvent::WorkerExited { ta });
    Ok(report)
}

/// One locked pass: rubric review, slot claim, and exam advance if due.
fn review_and_claim<S, R>(
    session: &mut Session<'_>,
    ctx: &WorkerContext<'_, S>,
    rng: &mut R,
    report: &mut WorkerReport,
) -> Pass
where
    S: EventSink + ?Sized,
    R: Rng,
{
    let ta = session.ta();
    // Another worker may have finished the run after our lock-free check.
    if session.is_done() {
        return Pass::Exit;
    }

    let student_id = session.current_student_id();
    ctx.sink.emit(&MarkingEvent::ReviewStarted { ta, student_id });
    report.rubric_edits += review_rubric(session, ctx, rng);

    if let Some(slot) = session.claim_next_slot() {
        ctx.sink.emit(&MarkingEvent::SlotClaimed {
            ta,
            student_id,
            slot,
        });
        return Pass::Marking { slot, student_id };
    }

    if !session.all_marked() {
        return Pass::Waiting;
    }

    ctx.sink
        .emit(&MarkingEvent::ExamFullyClaimed { ta, student_id });
    let advance = session.advance(|exam| match ctx.catalog.extract_student_id(exam) {
        Ok(student_id) => Some(student_id),
        Err(err) => {
            warn!(ta, exam = %exam.display(), err = %err, "cannot load next exam");
            None
        }
    });
    match advance {
        Advance::Loaded {
            cursor,
            exam,
            student_id,
        } => {
            ctx.sink.emit(&MarkingEvent::ExamLoaded {
                ta,
                cursor,
                exam,
                student_id,
            });
            Pass::Advanced
        }
        Advance::Finished(reason) => {
            ctx.sink.emit(&MarkingEvent::RunFinished { ta, reason });
            Pass::Exit
        }
    }
}

/// Correct each grade with the configured odds, persisting after every change.
fn review_rubric<S, R>(session: &mut Session<'_>, ctx: &WorkerContext<'_, S>, rng: &mut R) -> usize
where
    S: EventSink + ?Sized,
    R: Rng,
{
    let probability = ctx.pacing.correction_probability();
    let mut edits = 0;
    for slot in 0..session.exercises() {
        if !rng.gen_bool(probability) {
            continue;
        }
        if let Some(edit) = session.correct_rubric(slot) {
            ctx.sink.emit(&MarkingEvent::RubricChanged {
                ta: session.ta(),
                slot: edit.slot,
                from: edit.from,
                to: edit.to,
            });
            ctx.rubric_store.persist(session.rubric());
            edits += 1;
        }
    }
    edits
}

fn pause<R: Rng>(rng: &mut R, min_ms: u64, max_ms: u64) {
    if max_ms == 0 {
        return;
    }
    thread::sleep(Duration::from_millis(rng.gen_range(min_ms..=max_ms)));
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::time::Instant;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::core::rubric::Rubric;
    use crate::core::state::SharedState;
    use crate::core::types::FinishReason;
    use crate::io::config::MarkingConfig;
    use crate::test_support::RecordingSink;

    struct Fixture {
        _temp: tempfile::TempDir,
        coordinator: Coordinator,
        catalog: ExamCatalog,
        store: RubricStore,
        pacing: PacingConfig,
    }

    fn fixture(exam_texts: &[&str], correction_one_in: u32) -> Fixture {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = MarkingConfig {
            exercises: 3,
            exams_dir: temp.path().join("exams"),
            rubric_path: temp.path().join("rubric.txt"),
            pacing: PacingConfig {
                correction_one_in,
                ..PacingConfig::instant()
            },
            ..MarkingConfig::default()
        };
        fs::create_dir_all(&config.exams_dir).expect("exams dir");
        let exams: Vec<PathBuf> = exam_texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let path = config.exam_path(i + 1);
                fs::write(&path, text).expect("write exam");
                path
            })
            .collect();
        let state = SharedState::new(exams, 1, Rubric::default_for(3)).expect("state");
        Fixture {
            coordinator: Coordinator::new(state),
            catalog: ExamCatalog::new(&config),
            store: RubricStore::new(&config.rubric_path, 3),
            pacing: config.pacing.clone(),
            _temp: temp,
        }
    }

    fn context<'a>(fx: &'a Fixture, sink: &'a RecordingSink) -> WorkerContext<'a, RecordingSink> {
        WorkerContext {
            coordinator: &fx.coordinator,
            catalog: &fx.catalog,
            rubric_store: &fx.store,
            pacing: &fx.pacing,
            sink,
        }
    }

    #[test]
    fn single_worker_marks_every_slot_of_every_exam() {
        let fx = fixture(&["1\n", "2\n"], 1_000_000);
        let sink = RecordingSink::default();
        let mut rng = StdRng::seed_from_u64(7);

        let report = run_worker(1, &context(&fx, &sink), &mut rng).expect("worker");

        assert_eq!(report.slots_marked, 6);
        assert_eq!(report.exams_advanced, 1);
        assert!(fx.coordinator.is_done());
        let events = sink.events();
        assert_eq!(
            events.iter().rev().nth(1),
            Some(&MarkingEvent::RunFinished {
                ta: 1,
                reason: FinishReason::Exhausted
            })
        );
        assert_eq!(events.last(), Some(&MarkingEvent::WorkerExited { ta: 1 }));
    }

    #[test]
    fn loading_next_exam_is_followed_by_backoff() {
        let mut fx = fixture(&["1\n", "2\n", "3\n"], 1_000_000);
        fx.pacing.backoff_ms = 20;
        let sink = RecordingSink::default();
        let mut rng = StdRng::seed_from_u64(5);

        let started = Instant::now();
        let report = run_worker(1, &context(&fx, &sink), &mut rng).expect("worker");

        assert_eq!(report.exams_advanced, 2);
        assert_eq!(report.backoffs, 0);
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn worker_exits_immediately_once_done() {
        let fx = fixture(&["1\n"], 4);
        {
            let mut session = fx.coordinator.acquire(0).expect("acquire");
            session.finish(FinishReason::Exhausted);
        }
        let sink = RecordingSink::default();
        let mut rng = StdRng::seed_from_u64(1);

        let report = run_worker(3, &context(&fx, &sink), &mut rng).expect("worker");

        assert_eq!(report.slots_marked, 0);
        assert_eq!(sink.events(), vec![MarkingEvent::WorkerExited { ta: 3 }]);
    }

    #[test]
    fn unreadable_next_exam_ends_run_without_advancing() {
        let fx = fixture(&["1\n", "no id here\n", "3\n"], 1_000_000);
        let sink = RecordingSink::default();
        let mut rng = StdRng::seed_from_u64(3);

        let report = run_worker(1, &context(&fx, &sink), &mut rng).expect("worker");

        assert_eq!(report.slots_marked, 3);
        assert_eq!(report.exams_advanced, 0);
        let finished = sink.events().into_iter().find_map(|event| match event {
            MarkingEvent::RunFinished { reason, .. } => Some(reason),
            _ => None,
        });
        assert!(matches!(
            finished,
            Some(FinishReason::UnreadableExam { exam }) if exam.ends_with("exam2.txt")
        ));
    }

    #[test]
    fn every_rubric_change_is_persisted() {
        let fx = fixture(&["1\n"], 1);
        let sink = RecordingSink::default();
        let mut rng = StdRng::seed_from_u64(11);

        let report = run_worker(1, &context(&fx, &sink), &mut rng).expect("worker");

        // Certain correction: every slot edited on each of the four passes.
        assert_eq!(report.rubric_edits, 12);
        let state = fx.coordinator.into_state().expect("state");
        assert_eq!(state.rubric().grades(), &['E', 'F', 'G']);
        assert_eq!(fx.store.load(), *state.rubric());
    }
}
