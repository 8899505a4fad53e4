//! Shared deterministic types for resolving one invocation.
//!
//! These types define stable contracts between core components. They carry no
//! I/O handles and compare structurally so tests can assert on them directly.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::error::RunError;

/// Option map handed between parser, combiner and executor.
///
/// Insertion order is preserved (`serde_json/preserve_order`) so help output
/// and pass-through options keep the order the user wrote them in.
pub type Options = Map<String, Value>;

/// Structured form of `run <project>:<target>[:<configuration>] [flags]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub project: String,
    pub target: String,
    pub configuration: Option<String>,
    pub help: bool,
    /// Executor pass-through options with the recognized flags stripped.
    pub options: Options,
    /// Positional tokens after the invocation string.
    pub positional: Vec<String>,
}

impl RunRequest {
    /// `project:target[:configuration]`, as used in help and log output.
    pub fn label(&self) -> String {
        match &self.configuration {
            Some(configuration) => format!("{}:{}:{}", self.project, self.target, configuration),
            None => format!("{}:{}", self.project, self.target),
        }
    }
}

/// Programmatic equivalent of the positional invocation string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDescription {
    pub project: String,
    pub target: String,
    pub configuration: Option<String>,
}

/// Parsed `<moduleName>:<executorName>` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExecutorRef {
    pub module: String,
    pub name: String,
}

impl ExecutorRef {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }

    /// Split at the last `:` so scoped modules (`@scope/pkg:build`) parse.
    pub fn parse(reference: &str) -> Result<Self, RunError> {
        let invalid = || RunError::InvalidExecutorRef {
            reference: reference.to_string(),
        };
        let (module, name) = reference.rsplit_once(':').ok_or_else(invalid)?;
        if module.trim().is_empty() || name.trim().is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(module, name))
    }
}

impl fmt::Display for ExecutorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.name)
    }
}

/// A single success/failure report from an executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
}

impl Outcome {
    pub const SUCCESS: Outcome = Outcome { success: true };
    pub const FAILURE: Outcome = Outcome { success: false };
}
