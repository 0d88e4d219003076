//! Stable exit codes for the `marking` CLI.

/// Every worker ran to completion.
pub const OK: i32 = 0;
/// Usage error, invalid config, no exams discovered, or another startup failure.
pub const INVALID: i32 = 1;
