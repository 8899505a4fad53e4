//! Renders an executor's option schema as `--help` text.

use std::io::Write;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::schema::ExecutorSchema;

const HELP_TEMPLATE: &str = include_str!("templates/help.txt");

#[derive(Debug, Serialize)]
struct OptionRow {
    flags: String,
    kind: String,
    notes: String,
    description: Option<String>,
    choices: Vec<String>,
}

/// Render help for `label` (`project:target[:configuration]`).
pub fn render_help(label: &str, schema: &ExecutorSchema) -> Result<String> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_template("help.txt", HELP_TEMPLATE)
        .context("load help template")?;

    let options: Vec<OptionRow> = schema
        .properties()
        .filter(|(_, property)| property.visible != Some(false))
        .map(|(name, property)| {
            let mut flags = format!("--{name}");
            for alias in property.all_aliases() {
                let dashes = if alias.chars().count() == 1 { "-" } else { "--" };
                flags.push_str(&format!(", {dashes}{alias}"));
            }
            let mut notes = String::new();
            if schema.is_required(name) {
                notes.push_str("  (required)");
            }
            if let Some(default) = &property.default {
                notes.push_str(&format!("  [default: {default}]"));
            }
            OptionRow {
                flags,
                kind: property.type_label(),
                notes,
                description: property.description.clone(),
                choices: property
                    .allowed
                    .iter()
                    .flatten()
                    .map(ToString::to_string)
                    .collect(),
            }
        })
        .collect();

    let summary = match (schema.title(), schema.description()) {
        (Some(title), Some(description)) => Some(format!("{title}: {description}")),
        (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
        (None, None) => None,
    };

    let template = env.get_template("help.txt")?;
    let rendered = template.render(context! {
        label => label,
        summary => summary,
        options => options,
    })?;
    Ok(rendered)
}

/// Render help and write it to `out`.
pub fn print_help<W: Write>(out: &mut W, label: &str, schema: &ExecutorSchema) -> Result<()> {
    let rendered = render_help(label, schema)?;
    writeln!(out, "{rendered}").context("write help")?;
    Ok(())
}
