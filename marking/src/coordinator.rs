//! The lock every worker goes through to touch shared state.
//!
//! [`Coordinator`] owns the single [`SharedState`] behind a mutex. Acquiring
//! returns a [`Session`]; dropping the session releases the lock, so every
//! acquire is paired with exactly one release on every path, early returns
//! included.
//!
//! `done` is mirrored into an atomic flag that workers may read without the
//! lock. The mirror is written only while a session is held and only moves
//! from false to true.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;
use tracing::trace;

use crate::core::state::SharedState;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// A worker panicked while holding the lock; the shared state can no
    /// longer be trusted.
    #[error("shared state lock poisoned by a panicking worker")]
    Poisoned,
}

#[derive(Debug)]
pub struct Coordinator {
    state: Mutex<SharedState>,
    done: AtomicBool,
    acquisitions: AtomicU64,
}

impl Coordinator {
    /// Take ownership of the initialised state. The lock starts released.
    pub fn new(state: SharedState) -> Self {
        let done = state.is_done();
        Self {
            state: Mutex::new(state),
            done: AtomicBool::new(done),
            acquisitions: AtomicU64::new(0),
        }
    }

    /// Block until the calling worker owns the shared state.
    pub fn acquire(&self, ta: usize) -> Result<Session<'_>, CoordinatorError> {
        let guard = self.state.lock().map_err(|_| CoordinatorError::Poisoned)?;
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        trace!(ta, "lock acquired");
        Ok(Session {
            guard,
            coordinator: self,
            ta,
        })
    }

    /// Copy of the shared state for observers outside the worker pool.
    ///
    /// Takes the lock but is not counted in [`Coordinator::acquisitions`].
    pub fn snapshot(&self) -> Result<SharedState, CoordinatorError> {
        let guard = self.state.lock().map_err(|_| CoordinatorError::Poisoned)?;
        Ok(guard.clone())
    }

    /// Lock-free read of the monotonic `done` flag.
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    /// Tear down after every worker has exited and hand back the final state.
    pub fn into_state(self) -> Result<SharedState, CoordinatorError> {
        self.state
            .into_inner()
            .map_err(|_| CoordinatorError::Poisoned)
    }
}

/// Exclusive access to the shared state for one worker.
pub struct Session<'a> {
    guard: MutexGuard<'a, SharedState>,
    coordinator: &'a Coordinator,
    ta: usize,
}

impl Session<'_> {
    pub fn ta(&self) -> usize {
        self.ta
    }

    /// Release the lock now.
    pub fn release(self) {}
}

impl Deref for Session<'_> {
    type Target = SharedState;

    fn deref(&self) -> &SharedState {
        &self.guard
    }
}

impl DerefMut for Session<'_> {
    fn deref_mut(&mut self) -> &mut SharedState {
        &mut self.guard
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        // Runs before the guard field drops, so the mirror is updated under the lock.
        if self.guard.is_done() {
            self.coordinator.done.store(true, Ordering::Release);
        }
        trace!(ta = self.ta, "lock released");
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::core::rubric::Rubric;
    use crate::core::types::FinishReason;

    fn coordinator(exams: usize, slots: usize) -> Coordinator {
        let exams = (1..=exams)
            .map(|i| PathBuf::from(format!("exam{i}.txt")))
            .collect();
        Coordinator::new(SharedState::new(exams, 1, Rubric::default_for(slots)).expect("state"))
    }

    #[test]
    fn done_mirror_is_published_on_release() {
        let coordinator = coordinator(1, 2);
        let mut session = coordinator.acquire(1).expect("acquire");
        session.finish(FinishReason::Exhausted);
        session.release();

        assert!(coordinator.is_done());
        assert_eq!(coordinator.acquisitions(), 1);
        let session = coordinator.acquire(2).expect("acquire again");
        assert!(session.is_done());
    }

    #[test]
    fn snapshot_is_not_counted_as_an_acquisition() {
        let coordinator = coordinator(2, 3);
        let state = coordinator.snapshot().expect("snapshot");

        assert_eq!(state.total_exams(), 2);
        assert_eq!(coordinator.acquisitions(), 0);
    }

    #[test]
    fn concurrent_claims_never_hand_out_a_slot_twice() {
        let slots = 64;
        let coordinator = Arc::new(coordinator(1, slots));
        let handles: Vec<_> = (1..=8)
            .map(|ta| {
                let coordinator = Arc::clone(&coordinator);
                thread::spawn(move || {
                    let mut claimed = Vec::new();
                    loop {
                        let mut session = coordinator.acquire(ta).expect("acquire");
                        match session.claim_next_slot() {
                            Some(slot) => claimed.push(slot),
                            None => return claimed,
                        }
                    }
                })
            })
            .collect();

        let mut all: Vec<usize> = handles
            .into_iter()
            .flat_map(|handle| handle.join().expect("join"))
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..slots).collect::<Vec<_>>());
    }

    #[test]
    fn panic_while_holding_lock_poisons_coordinator() {
        let coordinator = Arc::new(coordinator(1, 1));
        let poisoner = Arc::clone(&coordinator);
        let result = thread::spawn(move || {
            let _session = poisoner.acquire(1).expect("acquire");
            panic!("worker died holding the lock");
        })
        .join();
        assert!(result.is_err());

        assert!(matches!(
            coordinator.acquire(2),
            Err(CoordinatorError::Poisoned)
        ));
    }
}
