//! Runner configuration stored in `taskrun.toml` at the workspace root.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "taskrun.toml";

/// Contents of `taskrun.toml`.
///
/// The file is optional and edited by humans. Missing fields default to
/// values that work without any legacy tooling installed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct RunnerConfig {
    pub commands: CommandsConfig,
    pub legacy: LegacyConfig,
}

/// Limits for the bundled `run-commands` executor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommandsConfig {
    /// Per-command wall-clock budget in seconds.
    pub timeout_secs: u64,

    /// Truncate captured stdout/stderr beyond this many bytes per stream.
    pub output_limit_bytes: usize,
}

/// Bridge for executors that are not native to taskrun.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LegacyConfig {
    /// Bridge command line (e.g. `["ng-bridge"]`). Empty disables the bridge.
    pub command: Vec<String>,

    /// Executor modules routed to the bridge.
    pub modules: Vec<String>,

    /// Wall-clock budget for one bridged target run, in seconds.
    pub timeout_secs: u64,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30 * 60,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            modules: Vec::new(),
            timeout_secs: 60 * 60,
        }
    }
}

impl LegacyConfig {
    pub fn is_enabled(&self) -> bool {
        !self.command.is_empty()
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.commands.timeout_secs == 0 {
            return Err(anyhow!("commands.timeout_secs must be > 0"));
        }
        if self.commands.output_limit_bytes == 0 {
            return Err(anyhow!("commands.output_limit_bytes must be > 0"));
        }
        if self.legacy.timeout_secs == 0 {
            return Err(anyhow!("legacy.timeout_secs must be > 0"));
        }
        if self.legacy.is_enabled() && self.legacy.command[0].trim().is_empty() {
            return Err(anyhow!("legacy.command must start with a program name"));
        }
        if !self.legacy.modules.is_empty() && !self.legacy.is_enabled() {
            return Err(anyhow!("legacy.modules requires legacy.command"));
        }
        Ok(())
    }
}

/// Read `taskrun.toml`; a missing file means all defaults.
pub fn load_config(path: &Path) -> Result<RunnerConfig> {
    let config = match fs::read_to_string(path) {
        Ok(contents) => toml::from_str::<RunnerConfig>(&contents)
            .with_context(|| format!("parse {}", path.display()))?,
        Err(err) if err.kind() == ErrorKind::NotFound => RunnerConfig::default(),
        Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
    };
    config
        .validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(config)
}
