//! `taskrun run`: parse, validate, resolve, combine, dispatch.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use tracing::{debug, instrument};

use crate::core::invocation::parse_run_request;
use crate::core::options::{CombineRequest, combine_options};
use crate::core::types::{ExecutorRef, Options, RunRequest, TargetDescription};
use crate::core::validate::validate_request;
use crate::dispatch::{Dispatch, dispatch};
use crate::executors::{ExecutorContext, ExecutorRegistry};
use crate::io::bridge::LegacyBridge;
use crate::io::workspace_store::{calculate_default_project_name, relative_cwd};
use crate::workspace::WorkspaceConfiguration;

/// Everything a run needs that outlives a single invocation.
pub struct RunEnv {
    /// Directory taskrun was invoked from.
    pub cwd: PathBuf,
    /// Workspace root (directory containing `workspace.json`).
    pub root: PathBuf,
    pub workspace: Arc<WorkspaceConfiguration>,
    pub registry: ExecutorRegistry,
    pub bridge: Box<dyn LegacyBridge>,
    pub verbose: bool,
}

/// Run `args` (everything after `run`) and return the exit code.
pub async fn run_one<W: Write>(env: &RunEnv, args: &[String], out: &mut W) -> Result<i32> {
    let default_project = calculate_default_project_name(&env.cwd, &env.root, &env.workspace);
    let request = parse_run_request(&env.cwd, args, default_project.as_deref())?;
    run_request(env, request, out).await
}

/// Run a target without going through argv parsing.
pub async fn run_target<W: Write>(
    env: &RunEnv,
    description: TargetDescription,
    overrides: Options,
    out: &mut W,
) -> Result<i32> {
    let request = RunRequest {
        project: description.project,
        target: description.target,
        configuration: description.configuration,
        help: false,
        options: overrides,
        positional: Vec::new(),
    };
    run_request(env, request, out).await
}

#[instrument(skip_all, fields(target = %request.label()))]
async fn run_request<W: Write>(env: &RunEnv, request: RunRequest, out: &mut W) -> Result<i32> {
    validate_request(&env.workspace, &request)?;
    let target = env
        .workspace
        .target(&request.project, &request.target)
        .ok_or_else(|| anyhow!("target {} vanished after validation", request.label()))?;

    let executor = ExecutorRef::parse(&target.executor)?;
    let descriptor = env.registry.read_executor(&executor)?;
    debug!(executor = %executor, native = descriptor.is_native(), "executor resolved");

    let options = if request.help {
        Options::new()
    } else {
        let relative = relative_cwd(&env.root, &env.cwd);
        combine_options(&CombineRequest {
            executor: &executor,
            schema: &descriptor.schema,
            target,
            configuration: request.configuration.as_deref(),
            cli_options: &request.options,
            positional: &request.positional,
            project_name: Some(&request.project),
            relative_cwd: relative.as_deref(),
        })?
    };

    let context = ExecutorContext {
        root: env.root.clone(),
        cwd: env.cwd.clone(),
        project_name: request.project.clone(),
        target_name: request.target.clone(),
        configuration_name: request.configuration.clone(),
        workspace: Arc::clone(&env.workspace),
        verbose: env.verbose,
    };

    dispatch(
        Dispatch {
            request: &request,
            executor: &executor,
            descriptor: &descriptor,
            options,
            context,
        },
        env.bridge.as_ref(),
        out,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RunError;
    use crate::core::schema::ExecutorSchema;
    use crate::core::types::Outcome;
    use crate::exit_codes;
    use crate::io::bridge::NoBridge;
    use crate::test_support::{Script, ScriptedBridge, ScriptedExecutor, WorkspaceBuilder};
    use serde_json::json;

    const SCHEMA: &str = r#"{
        "type": "object",
        "properties": {
            "mode": { "type": "string", "default": "dev" },
            "outputPath": { "type": "string", "alias": "o" }
        }
    }"#;

    fn options(value: serde_json::Value) -> Options {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    fn env(executor: &ScriptedExecutor, bridge: Box<dyn LegacyBridge>) -> RunEnv {
        let workspace = WorkspaceBuilder::new()
            .project("app", "apps/app")
            .target("app", "build", "@acme/tools:build")
            .options("app", "build", options(json!({ "outputPath": "dist/app" })))
            .configuration(
                "app",
                "build",
                "production",
                options(json!({ "mode": "prod", "outputPath": "dist/prod" })),
            )
            .target("app", "serve", "@legacy/dev:server")
            .default_project("app")
            .build();
        let mut registry = ExecutorRegistry::new();
        registry
            .register_native(
                ExecutorRef::new("@acme/tools", "build"),
                ExecutorSchema::from_json_str(SCHEMA).expect("schema"),
                Arc::new(executor.clone()),
            )
            .legacy_module("@legacy/dev");
        RunEnv {
            cwd: PathBuf::from("/repo/apps/app"),
            root: PathBuf::from("/repo"),
            workspace: Arc::new(workspace),
            registry,
            bridge,
            verbose: false,
        }
    }

    #[tokio::test]
    async fn layers_options_by_precedence() {
        let executor = ScriptedExecutor::new(Script::Single(Outcome::SUCCESS));
        let env = env(&executor, Box::new(NoBridge));
        let mut out = Vec::new();
        let code = run_one(&env, &args(&["app:build", "--prod", "-o", "out"]), &mut out)
            .await
            .expect("run");
        assert_eq!(code, exit_codes::OK);
        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        let (options, context) = &calls[0];
        assert_eq!(options.get("outputPath"), Some(&json!("out")));
        assert_eq!(options.get("mode"), Some(&json!("prod")));
        assert_eq!(context.configuration_name.as_deref(), Some("production"));
    }

    #[tokio::test]
    async fn project_defaults_from_cwd() {
        let executor = ScriptedExecutor::new(Script::Single(Outcome::SUCCESS));
        let env = env(&executor, Box::new(NoBridge));
        let mut out = Vec::new();
        run_one(&env, &args(&[":build"]), &mut out)
            .await
            .expect("run");
        let calls = executor.calls();
        assert_eq!(calls[0].1.project_name, "app");
        assert_eq!(calls[0].0.get("mode"), Some(&json!("dev")));
    }

    #[tokio::test]
    async fn help_skips_combining_and_executor() {
        let executor = ScriptedExecutor::new(Script::Single(Outcome::FAILURE));
        let env = env(&executor, Box::new(NoBridge));
        let mut out = Vec::new();
        let code = run_one(&env, &args(&["app:build", "--help", "--mode=7"]), &mut out)
            .await
            .expect("run");
        assert_eq!(code, exit_codes::OK);
        assert!(executor.calls().is_empty());
        assert!(String::from_utf8(out).expect("utf8").contains("--outputPath, -o"));
    }

    #[tokio::test]
    async fn validation_errors_surface_as_run_errors() {
        let executor = ScriptedExecutor::new(Script::Single(Outcome::SUCCESS));
        let env = env(&executor, Box::new(NoBridge));
        let mut out = Vec::new();
        let err = run_one(&env, &args(&["app:build:staging"]), &mut out)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RunError>(),
            Some(RunError::ConfigurationNotFound { .. })
        ));
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn run_target_uses_description_and_overrides() {
        let executor = ScriptedExecutor::new(Script::Stream(vec![
            Outcome::SUCCESS,
            Outcome::FAILURE,
        ]));
        let env = env(&executor, Box::new(NoBridge));
        let mut out = Vec::new();
        let code = run_target(
            &env,
            TargetDescription {
                project: "app".to_string(),
                target: "build".to_string(),
                configuration: None,
            },
            options(json!({ "mode": "test" })),
            &mut out,
        )
        .await
        .expect("run");
        assert_eq!(code, exit_codes::FAILURE);
        assert_eq!(executor.calls()[0].0.get("mode"), Some(&json!("test")));
    }

    #[tokio::test]
    async fn legacy_targets_go_through_bridge() {
        let executor = ScriptedExecutor::new(Script::Single(Outcome::SUCCESS));
        let bridge = ScriptedBridge::new(vec![Outcome::SUCCESS]);
        let env = env(&executor, Box::new(bridge.clone()));
        let mut out = Vec::new();
        let code = run_one(&env, &args(&["app:serve", "--port=4200"]), &mut out)
            .await
            .expect("run");
        assert_eq!(code, exit_codes::OK);
        let requests = bridge.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].executor, "@legacy/dev:server");
        assert_eq!(requests[0].options.get("port"), Some(&json!(4200)));
        assert!(executor.calls().is_empty());
    }
}
