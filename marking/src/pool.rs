//! Orchestration for a marking run.
//!
//! [`initialize`] builds the shared state once, before any worker exists.
//! [`Pool::run`] spawns one named thread per worker, joins every one of them,
//! and only then tears the coordinator down.

use std::thread;

use anyhow::{Context, Result, anyhow};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{error, info, instrument, warn};

use crate::coordinator::Coordinator;
use crate::core::state::SharedState;
use crate::core::types::{MarkingEvent, WorkerReport};
use crate::io::catalog::ExamCatalog;
use crate::io::config::{MarkingConfig, PacingConfig};
use crate::io::events::EventSink;
use crate::io::rubric_store::RubricStore;
use crate::io::run_report::RunReport;
use crate::worker::{WorkerContext, run_worker};

/// Options for one run that do not belong in the config file.
#[derive(Debug, Clone, Default)]
pub struct PoolOptions {
    pub workers: usize,
    /// Worker `n` seeds its RNG with `seed ^ n`; `None` uses entropy.
    pub seed: Option<u64>,
}

/// How a worker thread ended, as observed by joining it.
#[derive(Debug)]
pub enum WorkerStatus {
    Finished(WorkerReport),
    Failed { ta: usize, error: String },
    Panicked { ta: usize },
}

/// Result of a run: per-worker status plus the torn-down shared state.
#[derive(Debug)]
pub struct PoolOutcome {
    pub statuses: Vec<WorkerStatus>,
    pub final_state: SharedState,
    pub lock_acquisitions: u64,
}

impl PoolOutcome {
    pub fn reports(&self) -> Vec<&WorkerReport> {
        self.statuses
            .iter()
            .filter_map(|status| match status {
                WorkerStatus::Finished(report) => Some(report),
                _ => None,
            })
            .collect()
    }

    pub fn failed_workers(&self) -> Vec<usize> {
        self.statuses
            .iter()
            .filter_map(|status| match status {
                WorkerStatus::Finished(_) => None,
                WorkerStatus::Failed { ta, .. } | WorkerStatus::Panicked { ta } => Some(*ta),
            })
            .collect()
    }

    /// Exams fully claimed: everything before the cursor, plus the exam at
    /// the cursor once the run has finished on it.
    pub fn exams_completed(&self) -> usize {
        let state = &self.final_state;
        state.cursor() + usize::from(state.is_done() && state.all_marked())
    }

    pub fn to_report(&self) -> RunReport {
        RunReport {
            workers: self.reports().into_iter().cloned().collect(),
            failed_workers: self.failed_workers(),
            total_exams: self.final_state.total_exams(),
            exams_completed: self.exams_completed(),
            final_cursor: self.final_state.cursor(),
            final_exam: self.final_state.current_exam().to_path_buf(),
            final_rubric: self.final_state.rubric().to_string(),
            finish: self.final_state.finish_reason().cloned(),
            lock_acquisitions: self.lock_acquisitions,
        }
    }
}

/// Initialised shared state and the collaborators workers need.
#[derive(Debug)]
pub struct Pool {
    coordinator: Coordinator,
    catalog: ExamCatalog,
    rubric_store: RubricStore,
    pacing: PacingConfig,
}

/// Load the rubric, discover exams and point the cursor at the first one.
///
/// Fails when the config is invalid, no exam exists, or the first exam has
/// no readable student number. No worker is started in any of those cases.
#[instrument(skip_all)]
pub fn initialize(config: &MarkingConfig) -> Result<Pool> {
    config.validate().context("invalid marking config")?;

    let rubric_store = RubricStore::new(&config.rubric_path, config.exercises);
    let rubric = rubric_store.load();

    let catalog = ExamCatalog::new(config);
    let exams = catalog.discover()?;
    let first_student_id = catalog
        .extract_student_id(&exams[0])
        .context("read first exam")?;

    let state = SharedState::new(exams, first_student_id, rubric)?;
    info!(
        total_exams = state.total_exams(),
        student_id = first_student_id,
        rubric = %state.rubric(),
        "shared state initialised"
    );
    Ok(Pool {
        coordinator: Coordinator::new(state),
        catalog,
        rubric_store,
        pacing: config.pacing.clone(),
    })
}

impl Pool {
    /// Current snapshot of the shared state, taken under the lock.
    ///
    /// Only worker acquisitions are counted in the run report.
    pub fn snapshot(&self) -> Result<SharedState> {
        Ok(self.coordinator.snapshot()?)
    }

    /// Run `options.workers` workers to completion.
    #[instrument(skip_all, fields(workers = options.workers))]
    pub fn run<S>(self, options: &PoolOptions, sink: &S) -> Result<PoolOutcome>
    where
        S: EventSink + ?Sized,
    {
        if options.workers == 0 {
            return Err(anyhow!("pool needs at least one worker"));
        }
        {
            let state = self.snapshot()?;
            sink.emit(&MarkingEvent::PoolStarted {
                exam: state.current_exam().to_path_buf(),
                student_id: state.current_student_id(),
                total_exams: state.total_exams(),
            });
        }

        let ctx = WorkerContext {
            coordinator: &self.coordinator,
            catalog: &self.catalog,
            rubric_store: &self.rubric_store,
            pacing: &self.pacing,
            sink,
        };
        let statuses = spawn_and_join(&ctx, options)?;
        sink.emit(&MarkingEvent::PoolFinished {
            workers: options.workers,
        });

        let lock_acquisitions = self.coordinator.acquisitions();
        let final_state = self
            .coordinator
            .into_state()
            .context("tear down shared state")?;
        Ok(PoolOutcome {
            statuses,
            final_state,
            lock_acquisitions,
        })
    }
}

/// Initialise and run in one call.
pub fn run_pool<S>(config: &MarkingConfig, options: &PoolOptions, sink: &S) -> Result<PoolOutcome>
where
    S: EventSink + ?Sized,
{
    initialize(config)?.run(options, sink)
}

/// Normalise a requested worker count: missing, zero or negative means `default`.
pub fn worker_count(requested: Option<i64>, default: usize) -> usize {
    match requested {
        Some(n) if n > 0 => usize::try_from(n).unwrap_or(default),
        _ => default,
    }
}

fn spawn_and_join<S>(ctx: &WorkerContext<'_, S>, options: &PoolOptions) -> Result<Vec<WorkerStatus>>
where
    S: EventSink + ?Sized,
{
    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(options.workers);
        for ta in 1..=options.workers {
            let seed = options.seed;
            let handle = thread::Builder::new()
                .name(format!("ta-{ta}"))
                .spawn_scoped(scope, move || {
                    let mut rng = worker_rng(seed, ta);
                    run_worker(ta, ctx, &mut rng)
                })
                .with_context(|| format!("spawn worker {ta}"))?;
            handles.push((ta, handle));
        }

        let statuses = handles
            .into_iter()
            .map(|(ta, handle)| match handle.join() {
                Ok(Ok(report)) => WorkerStatus::Finished(report),
                Ok(Err(err)) => {
                    error!(ta, err = %format!("{err:#}"), "worker failed");
                    WorkerStatus::Failed {
                        ta,
                        error: format!("{err:#}"),
                    }
                }
                Err(_) => {
                    warn!(ta, "worker panicked");
                    WorkerStatus::Panicked { ta }
                }
            })
            .collect();
        Ok(statuses)
    })
}

fn worker_rng(seed: Option<u64>, ta: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ ta as u64),
        None => StdRng::from_entropy(),
    }
}
