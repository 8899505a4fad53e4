//! Adapter protocol: hands non-native executors to an external tool.
//!
//! The [`LegacyBridge`] trait keeps adapter details out of dispatch. The
//! process-backed implementation speaks a line protocol: the request goes in
//! as JSON on stdin, and every stdout line of the form `{"success": bool}` is
//! an outcome. Any other stdout line is echoed.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_stream::try_stream;
use futures::Stream;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::core::outcome::OutcomeStream;
use crate::core::error::RunError;
use crate::core::types::{Options, Outcome};
use crate::io::config::LegacyConfig;

/// Request forwarded to the bridge, options already combined.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRequest {
    pub project: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,
    pub executor: String,
    pub options: Options,
}

impl LegacyRequest {
    pub fn label(&self) -> String {
        match &self.configuration {
            Some(configuration) => format!("{}:{}:{}", self.project, self.target, configuration),
            None => format!("{}:{}", self.project, self.target),
        }
    }
}

pub trait LegacyBridge: Send + Sync {
    /// Start the target and return its outcomes as a lazy stream.
    fn schedule_target(
        &self,
        root: &Path,
        request: LegacyRequest,
        verbose: bool,
    ) -> Result<OutcomeStream>;
}

/// Bridge used when `legacy.command` is empty: every schedule fails.
pub struct NoBridge;

impl LegacyBridge for NoBridge {
    fn schedule_target(
        &self,
        _root: &Path,
        request: LegacyRequest,
        _verbose: bool,
    ) -> Result<OutcomeStream> {
        Err(RunError::LegacyBridgeUnavailable {
            executor: request.executor,
        }
        .into())
    }
}

/// Spawns `legacy.command <project>:<target>[:<configuration>]`.
#[derive(Debug, Clone)]
pub struct ProcessBridge {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessBridge {
    pub fn from_config(config: &LegacyConfig) -> Result<Self> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| anyhow!("legacy.command is empty"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

impl LegacyBridge for ProcessBridge {
    #[instrument(skip_all, fields(program = %self.program, target = %request.label()))]
    fn schedule_target(
        &self,
        root: &Path,
        request: LegacyRequest,
        verbose: bool,
    ) -> Result<OutcomeStream> {
        let mut payload = serde_json::to_vec(&request).context("serialize legacy request")?;
        payload.push(b'\n');

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(request.label())
            .current_dir(root)
            .env("TASKRUN_VERBOSE", if verbose { "1" } else { "0" })
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        info!(executor = %request.executor, "scheduling target on legacy bridge");
        let session = BridgeSession {
            cmd,
            payload,
            timeout: self.timeout,
            root: root.to_path_buf(),
        };
        Ok(Box::pin(session.into_outcomes()))
    }
}

struct BridgeSession {
    cmd: Command,
    payload: Vec<u8>,
    timeout: Duration,
    root: PathBuf,
}

impl BridgeSession {
    fn into_outcomes(mut self) -> impl Stream<Item = Result<Outcome>> + Send + 'static {
        try_stream! {
            let deadline = Instant::now() + self.timeout;
            let mut child = self
                .cmd
                .spawn()
                .with_context(|| format!("spawn legacy bridge in {}", self.root.display()))?;

            let mut stdin = child.stdin.take().ok_or_else(|| anyhow!("stdin was not piped"))?;
            match stdin.write_all(&self.payload).await {
                Ok(()) => {}
                // The exit status still decides the outcome.
                Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                    warn!("legacy bridge exited before reading the request");
                }
                Err(err) => Err::<(), _>(err).context("write legacy request")?,
            }
            drop(stdin);

            let stdout = child.stdout.take().ok_or_else(|| anyhow!("stdout was not piped"))?;
            let mut segments = BufReader::new(stdout).split(b'\n');
            loop {
                let segment = tokio::time::timeout_at(deadline, segments.next_segment())
                    .await
                    .map_err(|_| anyhow!("legacy bridge timed out after {:?}", self.timeout))?
                    .context("read legacy bridge output")?;
                let Some(segment) = segment else {
                    break;
                };
                let text = String::from_utf8_lossy(&segment);
                let line = text.strip_suffix('\r').unwrap_or(&text);
                match parse_outcome_line(line) {
                    Some(outcome) => {
                        debug!(success = outcome.success, "legacy outcome");
                        yield outcome;
                    }
                    None => println!("{line}"),
                }
            }

            let status = tokio::time::timeout_at(deadline, child.wait())
                .await
                .map_err(|_| anyhow!("legacy bridge timed out after {:?}", self.timeout))?
                .context("wait for legacy bridge")?;
            if !status.success() {
                warn!(exit_code = ?status.code(), "legacy bridge exited unsuccessfully");
                yield Outcome::FAILURE;
            }
        }
    }
}

/// `{"success": bool}` lines are outcomes; anything else is output.
fn parse_outcome_line(line: &str) -> Option<Outcome> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    serde_json::from_str::<Outcome>(trimmed).ok()
}
