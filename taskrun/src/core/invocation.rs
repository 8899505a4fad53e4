//! Turns `run` arguments into a [`RunRequest`].

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::core::args::{ArgSpec, camel_case_keys, parse_args};
use crate::core::error::RunError;
use crate::core::types::{Options, RunRequest};

const RUN_ARGS: ArgSpec<'static> = ArgSpec {
    booleans: &["help", "prod"],
    strings: &["configuration", "project"],
    aliases: &[("c", "configuration")],
};

/// Keys consumed by the runner itself; never forwarded to executors.
const RECOGNIZED_KEYS: [&str; 6] = ["help", "_", "c", "configuration", "prod", "project"];

const PRODUCTION: &str = "production";

/// Parse `<project>:<target>[:<configuration>]` plus flags.
///
/// Precedence, lowest to highest: invocation segments and the default
/// project, `--configuration`/`-c`, `--prod`, `--project`.
pub fn parse_run_request(
    cwd: &Path,
    args: &[String],
    default_project: Option<&str>,
) -> Result<RunRequest, RunError> {
    let parsed = parse_args(args, &RUN_ARGS);
    let mut options = camel_case_keys(parsed.flags);
    let mut positional = parsed.positional.into_iter();

    let invocation = positional
        .next()
        .filter(|token| !token.is_empty())
        .ok_or_else(|| RunError::InvalidInvocation {
            reason: "missing `<project>:<target>` argument".to_string(),
        })?;

    // Segments past the third are ignored.
    let mut segments = invocation.split(':').take(3).map(str::to_string);
    let mut project = segments.next().unwrap_or_default();
    let target = segments.next().unwrap_or_default();
    let mut configuration = segments.next().filter(|segment| !segment.is_empty());

    if project.is_empty()
        && let Some(default) = default_project
    {
        debug!(
            cwd = %cwd.display(),
            project = default,
            "no project name specified, using default project"
        );
        project = default.to_string();
    }

    if let Some(flag) = string_flag(&options, "configuration") {
        configuration = Some(flag);
    }
    if options.get("prod").and_then(Value::as_bool) == Some(true) {
        configuration = Some(PRODUCTION.to_string());
    }
    if let Some(flag) = string_flag(&options, "project") {
        project = flag;
    }

    if project.is_empty() || target.is_empty() {
        return Err(RunError::InvalidInvocation {
            reason: format!("could not resolve project and target from '{invocation}'"),
        });
    }

    let help = options.get("help").and_then(Value::as_bool).unwrap_or(false);
    strip_recognized(&mut options);

    Ok(RunRequest {
        project,
        target,
        configuration,
        help,
        options,
        positional: positional.collect(),
    })
}

// Empty strings count as absent, so `--project=` cannot erase a parsed name.
fn string_flag(options: &Options, key: &str) -> Option<String> {
    match options.get(key)? {
        Value::String(value) if !value.is_empty() => Some(value.clone()),
        Value::Array(values) => values
            .iter()
            .rev()
            .find_map(|value| value.as_str().filter(|value| !value.is_empty()))
            .map(str::to_string),
        _ => None,
    }
}

fn strip_recognized(options: &mut Options) {
    for key in RECOGNIZED_KEYS {
        options.shift_remove(key);
    }
}
