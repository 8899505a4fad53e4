//! Static `(module, executor)` → descriptor table.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use super::noop::NoopExecutor;
use super::run_commands::RunCommandsExecutor;
use super::{BUILTIN_MODULE, Executor, ExecutorDescriptor};
use crate::core::error::RunError;
use crate::core::schema::ExecutorSchema;
use crate::core::types::ExecutorRef;
use crate::io::config::RunnerConfig;

/// Resolves executor references once, up front, instead of loading them on
/// demand.
#[derive(Debug, Default, Clone)]
pub struct ExecutorRegistry {
    entries: HashMap<ExecutorRef, ExecutorDescriptor>,
    legacy_modules: BTreeSet<String>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the bundled executors and the configured legacy modules.
    pub fn with_builtins(config: &RunnerConfig) -> Result<Self> {
        let mut registry = Self::new();
        registry.register_native(
            ExecutorRef::new(BUILTIN_MODULE, "noop"),
            NoopExecutor::schema()?,
            Arc::new(NoopExecutor),
        );
        registry.register_native(
            ExecutorRef::new(BUILTIN_MODULE, "run-commands"),
            RunCommandsExecutor::schema()?,
            Arc::new(RunCommandsExecutor::new(config.commands.clone())),
        );
        for module in &config.legacy.modules {
            registry.legacy_module(module.clone());
        }
        Ok(registry)
    }

    pub fn register_native(
        &mut self,
        reference: ExecutorRef,
        schema: ExecutorSchema,
        executor: Arc<dyn Executor>,
    ) -> &mut Self {
        self.entries
            .insert(reference, ExecutorDescriptor::native(schema, executor));
        self
    }

    pub fn register_legacy(&mut self, reference: ExecutorRef, schema: ExecutorSchema) -> &mut Self {
        self.entries
            .insert(reference, ExecutorDescriptor::legacy(schema));
        self
    }

    /// Route every executor of `module` to the legacy bridge with an open schema.
    pub fn legacy_module(&mut self, module: impl Into<String>) -> &mut Self {
        self.legacy_modules.insert(module.into());
        self
    }

    pub fn read_executor(&self, reference: &ExecutorRef) -> Result<ExecutorDescriptor, RunError> {
        if let Some(descriptor) = self.entries.get(reference) {
            return Ok(descriptor.clone());
        }
        if self.legacy_modules.contains(&reference.module) {
            debug!(executor = %reference, "resolved through legacy module");
            return Ok(ExecutorDescriptor::legacy(ExecutorSchema::open()));
        }
        Err(RunError::ExecutorNotFound {
            reference: reference.to_string(),
        })
    }

    /// True when `reference` is invoked in-process.
    pub fn is_native(&self, reference: &ExecutorRef) -> bool {
        self.entries
            .get(reference)
            .is_some_and(ExecutorDescriptor::is_native)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::LegacyConfig;

    #[test]
    fn builtins_are_native() {
        let registry = ExecutorRegistry::with_builtins(&RunnerConfig::default()).expect("registry");
        let noop = ExecutorRef::new(BUILTIN_MODULE, "noop");
        let commands = ExecutorRef::new(BUILTIN_MODULE, "run-commands");
        assert!(registry.is_native(&noop));
        assert!(registry.is_native(&commands));
        let descriptor = registry.read_executor(&commands).expect("descriptor");
        assert!(descriptor.schema.is_required("commands"));
    }

    #[test]
    fn legacy_modules_resolve_to_adapter() {
        let config = RunnerConfig {
            legacy: LegacyConfig {
                command: vec!["bridge".to_string()],
                modules: vec!["@legacy/build".to_string()],
                ..LegacyConfig::default()
            },
            ..RunnerConfig::default()
        };
        let registry = ExecutorRegistry::with_builtins(&config).expect("registry");
        let reference = ExecutorRef::new("@legacy/build", "browser");
        let descriptor = registry.read_executor(&reference).expect("descriptor");
        assert!(!descriptor.is_native());
        assert!(!registry.is_native(&reference));
    }

    #[test]
    fn registered_legacy_executor_keeps_its_schema() {
        let mut registry = ExecutorRegistry::new();
        let reference = ExecutorRef::new("@legacy/build", "browser");
        let schema = ExecutorSchema::from_json_str(
            r#"{ "type": "object", "properties": { "outputPath": { "type": "string" } }, "required": ["outputPath"] }"#,
        )
        .expect("schema");
        registry.register_legacy(reference.clone(), schema);

        let descriptor = registry.read_executor(&reference).expect("descriptor");
        assert!(!descriptor.is_native());
        assert!(!registry.is_native(&reference));
        assert!(descriptor.schema.is_required("outputPath"));
        assert!(matches!(
            registry.read_executor(&ExecutorRef::new("@legacy/build", "server")),
            Err(RunError::ExecutorNotFound { .. })
        ));
    }

    #[test]
    fn unknown_executor_is_reported() {
        let registry = ExecutorRegistry::new();
        let err = registry
            .read_executor(&ExecutorRef::new("@acme/tools", "deploy"))
            .unwrap_err();
        assert_eq!(
            err,
            RunError::ExecutorNotFound {
                reference: "@acme/tools:deploy".to_string()
            }
        );
    }
}
