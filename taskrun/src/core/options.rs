//! Merges option sources into the final map handed to an executor.
//!
//! Precedence, lowest to highest: schema defaults and smart defaults, target
//! `options`, the named configuration's overrides, command-line options.
//! Smart and schema defaults only ever fill gaps, so they rank below every
//! explicit source.

use anyhow::{Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;

use crate::core::args::{camel_case_keys, coerce_scalar};
use crate::core::error::RunError;
use crate::core::schema::{ExecutorSchema, PropertySchema, SmartDefault};
use crate::core::types::{ExecutorRef, Options};
use crate::workspace::TargetConfiguration;

/// Inputs for [`combine_options`].
#[derive(Debug, Clone, Copy)]
pub struct CombineRequest<'a> {
    pub executor: &'a ExecutorRef,
    pub schema: &'a ExecutorSchema,
    pub target: &'a TargetConfiguration,
    pub configuration: Option<&'a str>,
    /// Pass-through options from the command line.
    pub cli_options: &'a Options,
    /// Positional tokens after the invocation string.
    pub positional: &'a [String],
    pub project_name: Option<&'a str>,
    /// Invocation directory relative to the workspace root.
    pub relative_cwd: Option<&'a str>,
}

/// Combine, default and validate options for one executor run.
pub fn combine_options(request: &CombineRequest<'_>) -> Result<Options> {
    let schema = request.schema;

    let cli = convert_aliases(
        coerce_types(camel_case_keys(request.cli_options.clone()), schema),
        schema,
    );

    let mut combined = request.target.options.clone().unwrap_or_default();
    if let Some(name) = request.configuration
        && let Some(overrides) = request
            .target
            .configurations
            .as_ref()
            .and_then(|configurations| configurations.get(name))
    {
        overlay(&mut combined, overrides.clone());
    }
    let mut combined = convert_aliases(combined, schema);
    overlay(&mut combined, cli);

    apply_smart_defaults(&mut combined, request);
    apply_schema_defaults(&mut combined, schema);

    validate_options(&combined, request.executor, schema)?;
    Ok(combined)
}

/// Validate options against the executor schema, collecting every violation.
pub fn validate_options(
    options: &Options,
    executor: &ExecutorRef,
    schema: &ExecutorSchema,
) -> Result<()> {
    let compiled = validator_for(schema.raw())
        .map_err(|err| anyhow!("invalid option schema for '{executor}': {err}"))?;
    let instance = Value::Object(options.clone());
    let messages: Vec<String> = compiled
        .iter_errors(&instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(RunError::InvalidOptions {
            executor: executor.to_string(),
            messages,
        }
        .into());
    }
    Ok(())
}

fn overlay(base: &mut Options, overrides: Options) {
    for (key, value) in overrides {
        base.insert(key, value);
    }
}

/// Rename alias keys to their canonical property names, keeping order.
fn convert_aliases(options: Options, schema: &ExecutorSchema) -> Options {
    options
        .into_iter()
        .map(|(key, value)| match schema.canonical_name(&key) {
            Some(canonical) => (canonical.to_string(), value),
            None => (key, value),
        })
        .collect()
}

/// Coerce command-line values to the property types the schema declares.
fn coerce_types(options: Options, schema: &ExecutorSchema) -> Options {
    options
        .into_iter()
        .map(|(key, value)| {
            let property = schema
                .property(&key)
                .or_else(|| schema.canonical_name(&key).and_then(|name| schema.property(name)));
            match property {
                Some(property) => {
                    let value = coerce_value(value, property);
                    (key, value)
                }
                None => (key, value),
            }
        })
        .collect()
}

fn coerce_value(value: Value, property: &PropertySchema) -> Value {
    if property.kind.is_none() || accepts_value(property, &value) {
        return value;
    }
    if property.accepts("array") {
        return match value {
            Value::Array(items) => Value::Array(items),
            other => Value::Array(vec![other]),
        };
    }
    match value {
        Value::String(raw) => {
            let coerced = coerce_scalar(&raw);
            if accepts_value(property, &coerced) {
                coerced
            } else {
                Value::String(raw)
            }
        }
        Value::Number(number) if property.accepts("string") => Value::String(number.to_string()),
        Value::Bool(flag) if property.accepts("string") => Value::String(flag.to_string()),
        other => other,
    }
}

fn accepts_value(property: &PropertySchema, value: &Value) -> bool {
    match value {
        Value::Null => property.accepts("null"),
        Value::Bool(_) => property.accepts("boolean"),
        Value::Number(number) => {
            property.accepts("number") || (property.accepts("integer") && number.is_i64())
        }
        Value::String(_) => property.accepts("string"),
        Value::Array(_) => property.accepts("array"),
        Value::Object(_) => property.accepts("object"),
    }
}

fn apply_smart_defaults(options: &mut Options, request: &CombineRequest<'_>) {
    for (name, property) in request.schema.properties() {
        if options.contains_key(name) {
            continue;
        }
        let filled = match &property.smart_default {
            Some(SmartDefault::Argv { index }) => request
                .positional
                .get(*index)
                .map(|raw| coerce_value(Value::String(raw.clone()), property)),
            Some(SmartDefault::ProjectName) => request
                .project_name
                .map(|project| Value::String(project.to_string())),
            Some(SmartDefault::Unsupported) | None => None,
        };
        let filled = filled.or_else(|| {
            let hidden_path =
                property.format.as_deref() == Some("path") && property.visible == Some(false);
            hidden_path
                .then_some(request.relative_cwd)
                .flatten()
                .filter(|cwd| !cwd.is_empty())
                .map(|cwd| Value::String(cwd.replace('\\', "/")))
        });
        if let Some(value) = filled {
            options.insert(name.to_string(), value);
        }
    }
}

fn apply_schema_defaults(options: &mut Options, schema: &ExecutorSchema) {
    for (name, property) in schema.properties() {
        if options.contains_key(name) {
            continue;
        }
        if let Some(default) = &property.default {
            options.insert(name.to_string(), default.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCHEMA: &str = r#"{
        "type": "object",
        "properties": {
            "outputPath": { "type": "string", "alias": "o", "default": "dist" },
            "optimize": { "type": "boolean", "default": false },
            "port": { "type": "number" },
            "assets": { "type": "array", "items": { "type": "string" } },
            "project": { "type": "string", "$default": { "$source": "projectName" } },
            "entry": { "type": "string", "$default": { "$source": "argv", "index": 0 } },
            "cwd": { "type": "string", "format": "path", "visible": false }
        },
        "additionalProperties": false
    }"#;

    fn schema() -> ExecutorSchema {
        ExecutorSchema::from_json_str(SCHEMA).expect("schema")
    }

    fn target() -> TargetConfiguration {
        serde_json::from_value(json!({
            "executor": "@acme/web:build",
            "options": { "outputPath": "build/app", "optimize": false, "port": 3000 },
            "configurations": {
                "production": { "optimize": true, "o": "build/prod" }
            }
        }))
        .expect("target")
    }

    fn options(value: Value) -> Options {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn combine(
        configuration: Option<&str>,
        cli: &Options,
        positional: &[String],
    ) -> Result<Options> {
        let executor = ExecutorRef::new("@acme/web", "build");
        let schema = schema();
        let target = target();
        combine_options(&CombineRequest {
            executor: &executor,
            schema: &schema,
            target: &target,
            configuration,
            cli_options: cli,
            positional,
            project_name: Some("app"),
            relative_cwd: Some("apps/app"),
        })
    }

    #[test]
    fn target_options_apply_without_configuration() {
        let combined = combine(None, &Options::new(), &[]).expect("combine");
        assert_eq!(combined["outputPath"], json!("build/app"));
        assert_eq!(combined["optimize"], json!(false));
        assert_eq!(combined["project"], json!("app"));
        assert_eq!(combined["cwd"], json!("apps/app"));
        assert!(!combined.contains_key("entry"));
    }

    #[test]
    fn configuration_overrides_target_and_aliases_resolve() {
        let combined = combine(Some("production"), &Options::new(), &[]).expect("combine");
        assert_eq!(combined["optimize"], json!(true));
        assert_eq!(combined["outputPath"], json!("build/prod"));
        assert!(!combined.contains_key("o"));
    }

    #[test]
    fn command_line_beats_configuration() {
        let cli = options(json!({ "optimize": "false", "port": "8080", "o": "out" }));
        let combined = combine(Some("production"), &cli, &[]).expect("combine");
        assert_eq!(combined["optimize"], json!(false));
        assert_eq!(combined["port"], json!(8080));
        assert_eq!(combined["outputPath"], json!("out"));
    }

    #[test]
    fn unknown_configuration_name_is_ignored() {
        let combined = combine(Some("staging"), &Options::new(), &[]).expect("combine");
        assert_eq!(combined["outputPath"], json!("build/app"));
    }

    #[test]
    fn schema_defaults_fill_remaining_gaps() {
        let executor = ExecutorRef::new("@acme/web", "build");
        let schema = schema();
        let target = TargetConfiguration::new("@acme/web:build");
        let combined = combine_options(&CombineRequest {
            executor: &executor,
            schema: &schema,
            target: &target,
            configuration: None,
            cli_options: &Options::new(),
            positional: &[],
            project_name: None,
            relative_cwd: None,
        })
        .expect("combine");
        assert_eq!(combined["outputPath"], json!("dist"));
        assert_eq!(combined["optimize"], json!(false));
        assert!(!combined.contains_key("project"));
    }

    #[test]
    fn argv_smart_default_and_array_coercion() {
        let cli = options(json!({ "assets": "favicon.ico" }));
        let combined = combine(None, &cli, &["src/main.ts".to_string()]).expect("combine");
        assert_eq!(combined["entry"], json!("src/main.ts"));
        assert_eq!(combined["assets"], json!(["favicon.ico"]));
    }

    #[test]
    fn schema_violations_are_reported() {
        let cli = options(json!({ "port": "not-a-port", "unknownFlag": true }));
        let err = combine(None, &cli, &[]).unwrap_err();
        match err.downcast_ref::<RunError>() {
            Some(RunError::InvalidOptions { executor, messages }) => {
                assert_eq!(executor, "@acme/web:build");
                assert!(messages.iter().any(|m| m.contains("not-a-port")), "{messages:?}");
                assert!(messages.iter().any(|m| m.contains("unknownFlag")), "{messages:?}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
