//! Concurrent exam marking by a pool of TA workers.
//!
//! Several workers mark a queue of exam files while sharing one mutable
//! record: the exam cursor, the rubric, and which exercise slots of the
//! current exam are already claimed. The architecture keeps a strict split:
//!
//! - **[`core`]**: Pure, deterministic logic (rubric edits, slot claiming,
//!   cursor advance). No I/O and no locking, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (exam files, rubric file, config,
//!   console output, run report).
//!
//! [`coordinator`] owns the shared record behind the single lock,
//! [`worker`] is the per-TA loop, and [`pool`] wires them into a run.

pub mod coordinator;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pool;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod worker;
