//! Workspace discovery and `workspace.json` loading.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::workspace::WorkspaceConfiguration;

pub const WORKSPACE_FILE: &str = "workspace.json";

const WORKSPACE_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/workspace/v1.schema.json"
));

/// Walk up from `cwd` to the nearest directory containing `workspace.json`.
pub fn find_workspace_root(cwd: &Path) -> Result<PathBuf> {
    cwd.ancestors()
        .find(|dir| dir.join(WORKSPACE_FILE).is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            anyhow!(
                "no {WORKSPACE_FILE} found in {} or any parent directory",
                cwd.display()
            )
        })
}

/// Load and schema-validate `<root>/workspace.json`.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn read_workspace(root: &Path) -> Result<WorkspaceConfiguration> {
    let path = root.join(WORKSPACE_FILE);
    let contents =
        fs::read_to_string(&path).with_context(|| format!("read workspace {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse workspace {}", path.display()))?;
    validate_schema(&value).with_context(|| format!("validate workspace {}", path.display()))?;
    let workspace: WorkspaceConfiguration = serde_json::from_value(value)
        .with_context(|| format!("deserialize workspace {}", path.display()))?;
    debug!(projects = workspace.projects.len(), "workspace loaded");
    Ok(workspace)
}

/// Write `workspace.json` with stable formatting.
#[cfg(any(test, feature = "test-support"))]
pub fn write_workspace(root: &Path, workspace: &WorkspaceConfiguration) -> Result<()> {
    let path = root.join(WORKSPACE_FILE);
    let mut buf = serde_json::to_string_pretty(workspace).context("serialize workspace")?;
    buf.push('\n');
    fs::write(&path, buf).with_context(|| format!("write workspace {}", path.display()))
}

/// `cwd` relative to `root`, `/`-separated; `None` when outside the workspace.
///
/// The workspace root itself yields `Some("")`.
pub fn relative_cwd(root: &Path, cwd: &Path) -> Option<String> {
    let relative = cwd.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Some(parts.join("/"))
}

/// Project whose root contains `cwd`, falling back to `defaultProject`.
///
/// When several project roots contain `cwd`, the deepest one wins.
pub fn calculate_default_project_name(
    cwd: &Path,
    root: &Path,
    workspace: &WorkspaceConfiguration,
) -> Option<String> {
    if let Some(relative) = relative_cwd(root, cwd).filter(|relative| !relative.is_empty()) {
        let matching = workspace
            .projects
            .iter()
            .filter(|(_, project)| {
                let project_root = project.root.trim_end_matches('/');
                !project_root.is_empty()
                    && (relative == project_root
                        || relative.starts_with(&format!("{project_root}/")))
            })
            .max_by_key(|(_, project)| project.root.len());
        if let Some((name, _)) = matching {
            return Some(name.clone());
        }
    }
    workspace.default_project.clone()
}

fn validate_schema(workspace: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(WORKSPACE_SCHEMA).context("parse workspace schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(workspace) {
        let messages = compiled
            .iter_errors(workspace)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "workspace schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::WorkspaceBuilder;

    fn workspace() -> WorkspaceConfiguration {
        let mut workspace = WorkspaceBuilder::new()
            .project("app", "apps/app")
            .project("app-e2e", "apps/app/e2e")
            .project("lib", "libs/lib")
            .target("app", "build", "@taskrun/workspace:noop")
            .build();
        workspace.default_project = Some("lib".to_string());
        workspace
    }

    #[test]
    fn write_then_read_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_workspace(temp.path(), &workspace()).expect("write");
        let loaded = read_workspace(temp.path()).expect("read");
        assert_eq!(loaded, workspace());
    }

    #[test]
    fn read_rejects_schema_violations() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(
            temp.path().join(WORKSPACE_FILE),
            r#"{ "projects": { "app": { "root": "apps/app", "targets": { "build": { "executor": "no-colon" } } } } }"#,
        )
        .expect("write");
        let err = read_workspace(temp.path()).unwrap_err();
        assert!(format!("{err:#}").contains("workspace schema validation failed"));
    }

    #[test]
    fn finds_root_from_nested_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_workspace(temp.path(), &workspace()).expect("write");
        let nested = temp.path().join("apps/app/src");
        fs::create_dir_all(&nested).expect("mkdir");
        assert_eq!(find_workspace_root(&nested).expect("root"), temp.path());
    }

    #[test]
    fn relative_cwd_is_slash_separated() {
        let root = Path::new("/repo");
        assert_eq!(relative_cwd(root, Path::new("/repo/apps/app")).as_deref(), Some("apps/app"));
        assert_eq!(relative_cwd(root, root).as_deref(), Some(""));
        assert_eq!(relative_cwd(root, Path::new("/elsewhere")), None);
    }

    #[test]
    fn default_project_prefers_deepest_matching_root() {
        let root = Path::new("/repo");
        let workspace = workspace();
        assert_eq!(
            calculate_default_project_name(Path::new("/repo/apps/app/e2e/specs"), root, &workspace)
                .as_deref(),
            Some("app-e2e")
        );
        assert_eq!(
            calculate_default_project_name(Path::new("/repo/apps/app/src"), root, &workspace)
                .as_deref(),
            Some("app")
        );
        assert_eq!(
            calculate_default_project_name(Path::new("/repo/apps/application"), root, &workspace)
                .as_deref(),
            Some("lib")
        );
        assert_eq!(
            calculate_default_project_name(root, root, &workspace).as_deref(),
            Some("lib")
        );
    }
}
