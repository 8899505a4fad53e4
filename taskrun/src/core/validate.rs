//! Checks a [`RunRequest`] against the workspace project graph.

use crate::core::error::{MissingConfiguration, RunError};
use crate::core::types::RunRequest;
use crate::workspace::WorkspaceConfiguration;

/// Validate project, target and configuration names; first violation wins.
///
/// A request without a configuration name is always valid.
pub fn validate_request(
    workspace: &WorkspaceConfiguration,
    request: &RunRequest,
) -> Result<(), RunError> {
    let project = workspace
        .project(&request.project)
        .ok_or_else(|| RunError::ProjectNotFound {
            project: request.project.clone(),
        })?;

    let target = project.targets.get(&request.target).ok_or_else(|| {
        let mut available: Vec<String> = project.targets.keys().cloned().collect();
        available.sort();
        RunError::TargetNotFound {
            project: request.project.clone(),
            target: request.target.clone(),
            available,
        }
    })?;

    let Some(configuration) = &request.configuration else {
        return Ok(());
    };

    let cause = match target.configuration_names() {
        None => MissingConfiguration::NoneDefined,
        Some(names) if names.contains(configuration) => return Ok(()),
        Some(names) => MissingConfiguration::NotFound(names),
    };
    Err(RunError::ConfigurationNotFound {
        project: request.project.clone(),
        target: request.target.clone(),
        configuration: configuration.clone(),
        cause,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{WorkspaceBuilder, request};

    fn workspace() -> WorkspaceConfiguration {
        WorkspaceBuilder::new()
            .project("app", "apps/app")
            .target("app", "test", "m:noop")
            .target("app", "build", "m:noop")
            .configurations("app", "build", &["b", "a"])
            .target("app", "lint", "m:noop")
            .build()
    }

    #[test]
    fn accepts_known_target_without_configuration() {
        validate_request(&workspace(), &request("app", "lint", None)).expect("valid");
    }

    #[test]
    fn accepts_known_configuration() {
        validate_request(&workspace(), &request("app", "build", Some("a"))).expect("valid");
    }

    #[test]
    fn rejects_unknown_project() {
        let err = validate_request(&workspace(), &request("ghost", "build", None)).unwrap_err();
        assert_eq!(
            err,
            RunError::ProjectNotFound {
                project: "ghost".to_string()
            }
        );
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn rejects_unknown_target_with_sorted_alternatives() {
        let err = validate_request(&workspace(), &request("app", "deploy", None)).unwrap_err();
        assert_eq!(
            err,
            RunError::TargetNotFound {
                project: "app".to_string(),
                target: "deploy".to_string(),
                available: vec!["build".to_string(), "lint".to_string(), "test".to_string()],
            }
        );
    }

    #[test]
    fn rejects_unknown_configuration_listing_names() {
        let err = validate_request(&workspace(), &request("app", "build", Some("x"))).unwrap_err();
        match err {
            RunError::ConfigurationNotFound { cause, .. } => assert_eq!(
                cause,
                MissingConfiguration::NotFound(vec!["a".to_string(), "b".to_string()])
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_configuration_when_target_defines_none() {
        let err = validate_request(&workspace(), &request("app", "lint", Some("x"))).unwrap_err();
        assert!(matches!(
            err,
            RunError::ConfigurationNotFound {
                cause: MissingConfiguration::NoneDefined,
                ..
            }
        ));
    }

    #[test]
    fn empty_configuration_map_reports_not_found() {
        let mut workspace = workspace();
        let target = workspace
            .projects
            .get_mut("app")
            .and_then(|project| project.targets.get_mut("lint"))
            .expect("lint target");
        target.configurations = Some(Default::default());

        let err = validate_request(&workspace, &request("app", "lint", Some("x"))).unwrap_err();
        assert!(matches!(
            err,
            RunError::ConfigurationNotFound {
                cause: MissingConfiguration::NotFound(ref names),
                ..
            } if names.is_empty()
        ));
    }
}
