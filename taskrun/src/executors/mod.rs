//! Executor abstraction and the static registry that resolves
//! `<module>:<executor>` references.
//!
//! The [`Executor`] trait decouples dispatch from what an executor actually
//! does. Tests register scripted executors that replay outcomes without
//! spawning processes.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::core::outcome::ExecutionOutcome;
use crate::core::schema::ExecutorSchema;
use crate::core::types::Options;
use crate::workspace::WorkspaceConfiguration;

pub mod noop;
pub mod registry;
pub mod run_commands;

pub use registry::ExecutorRegistry;

/// Module name of the executors bundled with taskrun.
pub const BUILTIN_MODULE: &str = "@taskrun/workspace";

/// Invocation context handed to an executor alongside its options.
#[derive(Debug, Clone)]
pub struct ExecutorContext {
    /// Workspace root (directory containing `workspace.json`).
    pub root: PathBuf,
    /// Directory taskrun was invoked from.
    pub cwd: PathBuf,
    pub project_name: String,
    pub target_name: String,
    pub configuration_name: Option<String>,
    pub workspace: Arc<WorkspaceConfiguration>,
    pub verbose: bool,
}

impl ExecutorContext {
    /// Absolute root of the project being run.
    pub fn project_root(&self) -> PathBuf {
        match self.workspace.project(&self.project_name) {
            Some(project) if !project.root.is_empty() => self.root.join(&project.root),
            _ => self.root.clone(),
        }
    }
}

/// In-process executor.
///
/// `run` is invoked synchronously; the returned outcome is then awaited or
/// drained by the dispatcher. Errors returned here, or yielded later by the
/// outcome, propagate unmodified.
pub trait Executor: Send + Sync {
    fn run(&self, options: Options, context: ExecutorContext) -> Result<ExecutionOutcome>;
}

/// How an executor is invoked.
#[derive(Clone)]
pub enum ExecutorImplementation {
    /// Called directly in-process.
    Native(Arc<dyn Executor>),
    /// Forwarded to the legacy bridge.
    Legacy,
}

/// Resolved executor: option schema plus implementation.
#[derive(Clone)]
pub struct ExecutorDescriptor {
    pub schema: Arc<ExecutorSchema>,
    pub implementation: ExecutorImplementation,
}

impl ExecutorDescriptor {
    pub fn native(schema: ExecutorSchema, executor: Arc<dyn Executor>) -> Self {
        Self {
            schema: Arc::new(schema),
            implementation: ExecutorImplementation::Native(executor),
        }
    }

    pub fn legacy(schema: ExecutorSchema) -> Self {
        Self {
            schema: Arc::new(schema),
            implementation: ExecutorImplementation::Legacy,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self.implementation, ExecutorImplementation::Native(_))
    }
}

impl std::fmt::Debug for ExecutorDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorDescriptor")
            .field("schema", &self.schema)
            .field("native", &self.is_native())
            .finish()
    }
}
