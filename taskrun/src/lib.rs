//! Workspace target runner.
//!
//! Resolves `run <project>:<target>[:<configuration>]` against a
//! `workspace.json` project graph and executes the target's executor. The
//! architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (argument parsing, validation,
//!   option combining, outcome normalization). No I/O.
//! - **[`io`]**: Side-effecting operations (workspace and config files, help
//!   output, child processes, the legacy bridge).
//! - **[`executors`]**: The executor trait, the static registry and the
//!   bundled executors.
//!
//! [`run`] and [`dispatch`] coordinate core logic with I/O to implement the
//! `run` command.

pub mod core;
pub mod dispatch;
pub mod executors;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod run;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod workspace;
