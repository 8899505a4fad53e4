//! Workspace target runner.
//!
//! Runs `<project>:<target>[:<configuration>]` from the nearest
//! `workspace.json`, through a native executor or the legacy bridge.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use taskrun::core::error::RunError;
use taskrun::executors::ExecutorRegistry;
use taskrun::exit_codes;
use taskrun::io::bridge::{LegacyBridge, NoBridge, ProcessBridge};
use taskrun::io::config::{CONFIG_FILE, load_config};
use taskrun::io::workspace_store::{find_workspace_root, read_workspace};
use taskrun::logging;
use taskrun::run::{RunEnv, run_one};

#[derive(Parser)]
#[command(name = "taskrun", version, about = "Run workspace targets")]
struct Cli {
    /// Enable debug diagnostics on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a target: `<project>:<target>[:<configuration>] [--flags]`.
    #[command(disable_help_flag = true)]
    Run {
        /// Invocation string, runner flags and executor options.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            error_code(&err)
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Run { args } => cmd_run(args, cli.verbose).await,
    }
}

async fn cmd_run(args: Vec<String>, verbose: bool) -> Result<i32> {
    let cwd = std::env::current_dir().context("resolve current directory")?;
    let root = find_workspace_root(&cwd)?;
    let config = load_config(&root.join(CONFIG_FILE))?;
    let workspace = read_workspace(&root)?;
    let registry = ExecutorRegistry::with_builtins(&config)?;
    let bridge: Box<dyn LegacyBridge> = if config.legacy.is_enabled() {
        Box::new(ProcessBridge::from_config(&config.legacy)?)
    } else {
        Box::new(NoBridge)
    };
    debug!(root = %root.display(), "workspace found");

    let env = RunEnv {
        cwd,
        root,
        workspace: Arc::new(workspace),
        registry,
        bridge,
        verbose,
    };
    let mut stdout = std::io::stdout();
    run_one(&env, &args, &mut stdout).await
}

fn error_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<RunError>() {
        Some(run_error) if run_error.is_usage() => exit_codes::INVALID,
        _ => exit_codes::INTERNAL,
    }
}
