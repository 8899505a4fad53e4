//! Typed view over an executor's JSON Schema option document.
//!
//! The raw document is kept for `jsonschema` validation; the typed
//! properties drive alias conversion, coercion, smart defaults and help.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorSchema {
    raw: Value,
    title: Option<String>,
    description: Option<String>,
    properties: Vec<(String, PropertySchema)>,
    required: Vec<String>,
}

/// Property-level keywords the runner understands.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: Option<SchemaType>,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub alias: Option<String>,
    pub aliases: Vec<String>,
    #[serde(rename = "enum")]
    pub allowed: Option<Vec<Value>>,
    #[serde(rename = "$default")]
    pub smart_default: Option<SmartDefault>,
    pub format: Option<String>,
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    One(String),
    Many(Vec<String>),
}

/// `$default` keyword: fill an option from the invocation context.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "$source", rename_all = "camelCase")]
pub enum SmartDefault {
    Argv { index: usize },
    ProjectName,
    /// Sources this runner does not fill (prompts, workspace lookups).
    #[serde(other)]
    Unsupported,
}

#[derive(Deserialize)]
struct RawSchema {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    properties: serde_json::Map<String, Value>,
    #[serde(default)]
    required: Vec<String>,
}

impl ExecutorSchema {
    pub fn from_value(raw: Value) -> Result<Self> {
        let parsed: RawSchema =
            serde_json::from_value(raw.clone()).context("parse executor schema")?;
        let properties = parsed
            .properties
            .into_iter()
            .map(|(name, value)| {
                let property: PropertySchema = serde_json::from_value(value)
                    .with_context(|| format!("parse schema property '{name}'"))?;
                Ok((name, property))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            raw,
            title: parsed.title,
            description: parsed.description,
            properties,
            required: parsed.required,
        })
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw).context("parse executor schema json")?;
        Self::from_value(value)
    }

    /// Accepts any object. Used for legacy executors whose schema lives
    /// with the external tool.
    pub fn open() -> Self {
        Self {
            raw: json!({ "type": "object" }),
            title: None,
            description: None,
            properties: Vec::new(),
            required: Vec::new(),
        }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &PropertySchema)> {
        self.properties
            .iter()
            .map(|(name, property)| (name.as_str(), property))
    }

    pub fn property(&self, name: &str) -> Option<&PropertySchema> {
        self.properties
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, property)| property)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|required| required == name)
    }

    /// Canonical property name for `key`, if `key` is one of its aliases.
    pub fn canonical_name(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(_, property)| property.all_aliases().any(|alias| alias == key))
            .map(|(name, _)| name.as_str())
    }
}

impl PropertySchema {
    pub fn all_aliases(&self) -> impl Iterator<Item = &str> {
        self.alias
            .iter()
            .chain(self.aliases.iter())
            .map(String::as_str)
    }

    /// True if the schema type is, or includes, `kind`.
    pub fn accepts(&self, kind: &str) -> bool {
        match &self.kind {
            Some(SchemaType::One(one)) => one == kind,
            Some(SchemaType::Many(many)) => many.iter().any(|candidate| candidate == kind),
            None => false,
        }
    }

    /// Type label for help output.
    pub fn type_label(&self) -> String {
        match &self.kind {
            Some(SchemaType::One(one)) => one.clone(),
            Some(SchemaType::Many(many)) => many.join(" | "),
            None => "any".to_string(),
        }
    }
}
