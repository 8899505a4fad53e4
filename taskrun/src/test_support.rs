//! Test-only helpers: workspace builders and scripted collaborators.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};

use crate::core::outcome::{ExecutionOutcome, OutcomeStream};
use crate::core::types::{Options, Outcome, RunRequest};
use crate::executors::{Executor, ExecutorContext};
use crate::io::bridge::{LegacyBridge, LegacyRequest};
use crate::workspace::{ProjectConfiguration, TargetConfiguration, WorkspaceConfiguration};

/// Fluent builder for in-memory workspaces.
#[derive(Debug, Default)]
pub struct WorkspaceBuilder {
    workspace: WorkspaceConfiguration,
}

impl WorkspaceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(mut self, name: &str, root: &str) -> Self {
        self.workspace.projects.insert(
            name.to_string(),
            ProjectConfiguration {
                root: root.to_string(),
                targets: Default::default(),
            },
        );
        self
    }

    /// Add a target; the project must have been added first.
    pub fn target(mut self, project: &str, target: &str, executor: &str) -> Self {
        self.project_mut(project)
            .targets
            .insert(target.to_string(), TargetConfiguration::new(executor));
        self
    }

    /// Set a target's `options`.
    pub fn options(mut self, project: &str, target: &str, options: Options) -> Self {
        self.target_mut(project, target).options = Some(options);
        self
    }

    /// Add empty configurations named `names` to a target.
    pub fn configurations(mut self, project: &str, target: &str, names: &[&str]) -> Self {
        let configurations = self
            .target_mut(project, target)
            .configurations
            .get_or_insert_with(Default::default);
        for name in names {
            configurations.insert(name.to_string(), Options::new());
        }
        self
    }

    /// Add one configuration with overrides.
    pub fn configuration(
        mut self,
        project: &str,
        target: &str,
        name: &str,
        overrides: Options,
    ) -> Self {
        self.target_mut(project, target)
            .configurations
            .get_or_insert_with(Default::default)
            .insert(name.to_string(), overrides);
        self
    }

    pub fn default_project(mut self, name: &str) -> Self {
        self.workspace.default_project = Some(name.to_string());
        self
    }

    pub fn build(self) -> WorkspaceConfiguration {
        self.workspace
    }

    fn project_mut(&mut self, project: &str) -> &mut ProjectConfiguration {
        self.workspace
            .projects
            .get_mut(project)
            .unwrap_or_else(|| panic!("project {project} not added"))
    }

    fn target_mut(&mut self, project: &str, target: &str) -> &mut TargetConfiguration {
        self.project_mut(project)
            .targets
            .get_mut(target)
            .unwrap_or_else(|| panic!("target {project}:{target} not added"))
    }
}

/// Request with no flags and no pass-through options.
pub fn request(project: &str, target: &str, configuration: Option<&str>) -> RunRequest {
    RunRequest {
        project: project.to_string(),
        target: target.to_string(),
        configuration: configuration.map(str::to_string),
        help: false,
        options: Options::new(),
        positional: Vec::new(),
    }
}

/// Executor context rooted at `root`, invoked from `root`.
pub fn context_for(
    root: &Path,
    workspace: Arc<WorkspaceConfiguration>,
    project: &str,
    target: &str,
) -> ExecutorContext {
    ExecutorContext {
        root: root.to_path_buf(),
        cwd: root.to_path_buf(),
        project_name: project.to_string(),
        target_name: target.to_string(),
        configuration_name: None,
        workspace,
        verbose: false,
    }
}

/// What a scripted collaborator hands back.
#[derive(Debug, Clone)]
pub enum Script {
    Single(Outcome),
    Stream(Vec<Outcome>),
    /// Fail synchronously with this message.
    Fail(String),
}

/// Executor that records every call and replays a fixed script.
#[derive(Debug, Clone)]
pub struct ScriptedExecutor {
    script: Script,
    calls: Arc<Mutex<Vec<(Options, ExecutorContext)>>>,
}

impl ScriptedExecutor {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<(Options, ExecutorContext)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl Executor for ScriptedExecutor {
    fn run(&self, options: Options, context: ExecutorContext) -> Result<ExecutionOutcome> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((options, context));
        match &self.script {
            Script::Single(outcome) => Ok(ExecutionOutcome::ready(*outcome)),
            Script::Stream(outcomes) => Ok(ExecutionOutcome::from_outcomes(outcomes.clone())),
            Script::Fail(message) => Err(anyhow!("{message}")),
        }
    }
}

/// Bridge that records scheduled requests and replays a fixed stream.
#[derive(Debug, Clone)]
pub struct ScriptedBridge {
    outcomes: Vec<Outcome>,
    requests: Arc<Mutex<Vec<LegacyRequest>>>,
}

impl ScriptedBridge {
    pub fn new(outcomes: Vec<Outcome>) -> Self {
        Self {
            outcomes,
            requests: Arc::default(),
        }
    }

    pub fn requests(&self) -> Vec<LegacyRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl LegacyBridge for ScriptedBridge {
    fn schedule_target(
        &self,
        _root: &Path,
        request: LegacyRequest,
        _verbose: bool,
    ) -> Result<OutcomeStream> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request);
        Ok(Box::pin(futures::stream::iter(
            self.outcomes.clone().into_iter().map(Ok),
        )))
    }
}
