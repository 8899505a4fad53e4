//! Stable exit codes for the `taskrun` binary.

/// Executor succeeded, or help was rendered.
pub const OK: i32 = 0;
/// Executor (or the last outcome it produced) reported failure.
pub const FAILURE: i32 = 1;
/// Invalid invocation, unknown project/target/configuration/executor, or
/// options rejected by the executor schema.
pub const INVALID: i32 = 2;
/// Internal or executor-raised error.
pub const INTERNAL: i32 = 3;
