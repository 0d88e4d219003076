//! Deterministic, pure logic shared by the marking pool.
//!
//! Core modules must be free of I/O side effects and of locking. They operate
//! on in-memory data and return deterministic outputs suitable for tests.

pub mod rubric;
pub mod state;
pub mod student_id;
pub mod types;
