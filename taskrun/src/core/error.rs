//! Typed failures raised while resolving and dispatching one invocation.
//!
//! Everything here is detected synchronously and is never recovered locally;
//! the binary maps these to exit codes in one place (see `main.rs`).

use thiserror::Error;

/// Why a requested configuration could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingConfiguration {
    /// The target declares no `configurations` map at all.
    NoneDefined,
    /// The map exists but lacks the key; carries the valid names.
    NotFound(Vec<String>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RunError {
    #[error("invalid invocation: {reason} (expected `run <project>:<target>[:<configuration>]`)")]
    InvalidInvocation { reason: String },

    #[error("cannot find project '{project}'")]
    ProjectNotFound { project: String },

    #[error(
        "cannot find target '{target}' for project '{project}' (available targets: {})",
        list_or_none(.available)
    )]
    TargetNotFound {
        project: String,
        target: String,
        available: Vec<String>,
    },

    #[error(
        "cannot find configuration '{configuration}' for '{project}:{target}' ({})",
        describe_missing(.cause)
    )]
    ConfigurationNotFound {
        project: String,
        target: String,
        configuration: String,
        cause: MissingConfiguration,
    },

    #[error("invalid executor reference '{reference}': expected `<module>:<executor>`")]
    InvalidExecutorRef { reference: String },

    #[error("cannot find executor '{reference}'")]
    ExecutorNotFound { reference: String },

    #[error("invalid options for '{executor}':\n- {}", .messages.join("\n- "))]
    InvalidOptions {
        executor: String,
        messages: Vec<String>,
    },

    #[error("executor '{executor}' produced no outcomes")]
    EmptyOutcomeStream { executor: String },

    #[error("executor '{executor}' is not native and no legacy bridge is configured")]
    LegacyBridgeUnavailable { executor: String },
}

impl RunError {
    /// True for errors caused by what the user typed or declared, as opposed
    /// to failures inside the runner or an executor.
    pub fn is_usage(&self) -> bool {
        !matches!(
            self,
            RunError::EmptyOutcomeStream { .. } | RunError::LegacyBridgeUnavailable { .. }
        )
    }
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

fn describe_missing(cause: &MissingConfiguration) -> String {
    match cause {
        MissingConfiguration::NoneDefined => "the target defines no configurations".to_string(),
        MissingConfiguration::NotFound(available) => {
            format!("available configurations: {}", list_or_none(available))
        }
    }
}
