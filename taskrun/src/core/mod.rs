//! Deterministic logic for resolving one invocation.
//!
//! Core modules do no I/O. They turn arguments, workspace data and executor
//! schemas into requests, validation errors and merged options, and reduce
//! executor outcomes to exit codes.

pub mod args;
pub mod error;
pub mod invocation;
pub mod options;
pub mod outcome;
pub mod schema;
pub mod types;
pub mod validate;
