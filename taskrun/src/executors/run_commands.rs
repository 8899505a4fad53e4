//! `@taskrun/workspace:run-commands`: shell commands as an outcome stream.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use async_stream::try_stream;
use futures::Stream;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::{Executor, ExecutorContext};
use crate::core::outcome::ExecutionOutcome;
use crate::core::schema::ExecutorSchema;
use crate::core::types::{Options, Outcome};
use crate::io::config::CommandsConfig;
use crate::io::process::{CommandOutput, RunLimits, run_captured};

const SCHEMA: &str = include_str!("../../schemas/run-commands.schema.json");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunCommandsOptions {
    commands: Vec<String>,
    cwd: Option<String>,
    #[serde(default)]
    env: BTreeMap<String, String>,
    timeout_secs: Option<u64>,
    #[serde(default = "default_bail")]
    bail: bool,
}

fn default_bail() -> bool {
    true
}

/// Runs each command through `sh -c`, yielding one outcome per command.
pub struct RunCommandsExecutor {
    config: CommandsConfig,
}

impl RunCommandsExecutor {
    pub fn new(config: CommandsConfig) -> Self {
        Self { config }
    }

    pub fn schema() -> Result<ExecutorSchema> {
        ExecutorSchema::from_json_str(SCHEMA)
    }
}

impl Executor for RunCommandsExecutor {
    fn run(&self, options: Options, context: ExecutorContext) -> Result<ExecutionOutcome> {
        let options: RunCommandsOptions =
            serde_json::from_value(Value::Object(options)).context("parse run-commands options")?;
        let workdir = match &options.cwd {
            Some(cwd) => context.root.join(cwd),
            None => context.project_root(),
        };
        let timeout = Duration::from_secs(options.timeout_secs.unwrap_or(self.config.timeout_secs));
        let plan = CommandPlan {
            commands: options.commands,
            env: options.env,
            bail: options.bail,
            workdir,
            limits: RunLimits {
                timeout,
                output_limit_bytes: self.config.output_limit_bytes,
            },
        };
        Ok(ExecutionOutcome::Stream(Box::pin(plan.into_outcomes())))
    }
}

#[derive(Debug, Clone)]
struct CommandPlan {
    commands: Vec<String>,
    env: BTreeMap<String, String>,
    bail: bool,
    workdir: PathBuf,
    limits: RunLimits,
}

impl CommandPlan {
    fn into_outcomes(self) -> impl Stream<Item = Result<Outcome>> + Send + 'static {
        try_stream! {
            let total = self.commands.len();
            for (index, command) in self.commands.iter().enumerate() {
                info!(step = index + 1, total, command = %command, "running command");
                let cmd = self.command(command);
                let limits = self.limits;
                let output = tokio::task::spawn_blocking(move || run_captured(cmd, limits))
                .await
                .context("join command task")?
                .with_context(|| format!("run `{command}`"))?;
                echo_output(command, &output)?;

                let success = output.success();
                if !success {
                    warn!(command = %command, exit_code = ?output.status.code(), timed_out = output.timed_out, "command failed");
                }
                yield Outcome { success };
                if !success && self.bail {
                    break;
                }
            }
        }
    }

    fn command(&self, command: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(&self.workdir)
            .envs(&self.env);
        cmd
    }
}

#[instrument(skip_all, fields(command = %command))]
fn echo_output(command: &str, output: &CommandOutput) -> Result<()> {
    std::io::stdout()
        .write_all(&output.stdout.bytes)
        .context("write command stdout")?;
    std::io::stderr()
        .write_all(&output.stderr.bytes)
        .context("write command stderr")?;
    if let Some(notice) = output.truncated_notice(command) {
        eprintln!("{notice}");
    }
    if output.timed_out {
        eprintln!("[{command}: timed out]");
    }
    Ok(())
}
