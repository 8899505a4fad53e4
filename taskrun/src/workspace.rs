use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::Options;

/// Contents of `workspace.json`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_project: Option<String>,
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectConfiguration>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectConfiguration {
    /// Project root relative to the workspace root, `/`-separated.
    pub root: String,
    #[serde(default, alias = "architect")]
    pub targets: BTreeMap<String, TargetConfiguration>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TargetConfiguration {
    /// `<module>:<executor>`.
    #[serde(alias = "builder")]
    pub executor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Options>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configurations: Option<BTreeMap<String, Options>>,
}

impl WorkspaceConfiguration {
    pub fn project(&self, name: &str) -> Option<&ProjectConfiguration> {
        self.projects.get(name)
    }

    pub fn target(&self, project: &str, target: &str) -> Option<&TargetConfiguration> {
        self.projects.get(project)?.targets.get(target)
    }
}

impl TargetConfiguration {
    pub fn new(executor: impl Into<String>) -> Self {
        Self {
            executor: executor.into(),
            options: None,
            configurations: None,
        }
    }

    /// Configuration names, sorted.
    pub fn configuration_names(&self) -> Option<Vec<String>> {
        self.configurations
            .as_ref()
            .map(|configurations| configurations.keys().cloned().collect())
    }
}
