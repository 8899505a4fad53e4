//! Flag tokenizer for the `run` argument list.
//!
//! Follows the conventional argv grammar: `--key=value`, `--key value`,
//! `--no-key`, `-k value`, grouped short flags and `--` as terminator.
//! Keys are stored exactly as written; camel-casing is the caller's job.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Number, Value};

use crate::core::types::Options;

/// Declares how specific keys are read.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArgSpec<'a> {
    /// Keys that never consume the following token.
    pub booleans: &'a [&'a str],
    /// Keys whose values are kept as strings (no coercion).
    pub strings: &'a [&'a str],
    /// `(alias, canonical)` pairs; values are stored under the canonical key.
    pub aliases: &'a [(&'a str, &'a str)],
}

impl<'a> ArgSpec<'a> {
    fn canonical<'k>(&self, key: &'k str) -> &'k str
    where
        'a: 'k,
    {
        self.aliases
            .iter()
            .find(|(alias, _)| *alias == key)
            .map_or(key, |(_, canonical)| *canonical)
    }

    fn is_boolean(&self, key: &str) -> bool {
        self.booleans.contains(&key)
    }

    fn is_string(&self, key: &str) -> bool {
        self.strings.contains(&key)
    }
}

/// Tokenized arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArgs {
    pub positional: Vec<String>,
    pub flags: Options,
}

pub fn parse_args(args: &[String], spec: &ArgSpec<'_>) -> ParsedArgs {
    let mut parsed = ParsedArgs::default();
    let mut index = 0;

    while index < args.len() {
        let arg = args[index].as_str();
        index += 1;

        if arg == "--" {
            parsed
                .positional
                .extend(args[index..].iter().map(ToString::to_string));
            break;
        }

        if let Some(long) = arg.strip_prefix("--") {
            if let Some((key, raw)) = long.split_once('=') {
                set_flag(&mut parsed.flags, spec, key, Some(raw));
                continue;
            }
            if let Some(negated) = long.strip_prefix("no-")
                && !spec.is_string(spec.canonical(negated))
            {
                insert(&mut parsed.flags, spec.canonical(negated), Value::Bool(false));
                continue;
            }
            let value = take_value(args, &mut index, spec, long);
            set_flag(&mut parsed.flags, spec, long, value.as_deref());
            continue;
        }

        if let Some(short) = arg.strip_prefix('-')
            && !short.is_empty()
            && !is_number(arg)
        {
            if let Some((key, raw)) = short.split_once('=') {
                set_flag(&mut parsed.flags, spec, key, Some(raw));
                continue;
            }
            let mut keys: Vec<String> = short.chars().map(String::from).collect();
            let last = keys.pop().unwrap_or_default();
            for key in &keys {
                set_flag(&mut parsed.flags, spec, key, None);
            }
            let value = take_value(args, &mut index, spec, &last);
            set_flag(&mut parsed.flags, spec, &last, value.as_deref());
            continue;
        }

        parsed.positional.push(arg.to_string());
    }

    parsed
}

/// Camel-case a hyphenated key: `output-path` becomes `outputPath`.
///
/// Keys whose first `-` sits at index 0 or 1 are returned unchanged.
pub fn camel_case(key: &str) -> String {
    static HYPHEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-(.)").unwrap());
    match key.find('-') {
        Some(position) if position > 1 => HYPHEN_RE
            .replace_all(&key.to_lowercase(), |caps: &Captures| caps[1].to_uppercase())
            .into_owned(),
        _ => key.to_string(),
    }
}

/// Camel-case every key of `options`, keeping order. Later keys win on clashes.
pub fn camel_case_keys(options: Options) -> Options {
    options
        .into_iter()
        .map(|(key, value)| (camel_case(&key), value))
        .collect()
}

/// Coerce a raw command-line value: booleans and numbers become JSON scalars.
pub fn coerce_scalar(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if is_number(raw) {
        if let Ok(int) = raw.parse::<i64>() {
            return Value::Number(int.into());
        }
        if let Some(float) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(float);
        }
    }
    Value::String(raw.to_string())
}

fn is_number(raw: &str) -> bool {
    static NUMBER_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^-?(?:0|[1-9]\d*)(?:\.\d+)?(?:[eE][-+]?\d+)?$").unwrap());
    NUMBER_RE.is_match(raw)
}

fn take_value(args: &[String], index: &mut usize, spec: &ArgSpec<'_>, key: &str) -> Option<String> {
    if spec.is_boolean(spec.canonical(key)) {
        return None;
    }
    let next = args.get(*index)?;
    if next == "--" || (next.starts_with('-') && next.len() > 1 && !is_number(next)) {
        return None;
    }
    *index += 1;
    Some(next.clone())
}

fn set_flag(flags: &mut Options, spec: &ArgSpec<'_>, key: &str, raw: Option<&str>) {
    let key = spec.canonical(key);
    let value = match raw {
        None if spec.is_string(key) => Value::String(String::new()),
        None => Value::Bool(true),
        Some(raw) if spec.is_string(key) => Value::String(raw.to_string()),
        Some(raw) if spec.is_boolean(key) => match coerce_scalar(raw) {
            Value::Bool(flag) => Value::Bool(flag),
            _ => Value::Bool(!raw.is_empty()),
        },
        Some(raw) => coerce_scalar(raw),
    };
    insert(flags, key, value);
}

// Booleans are switches and overwrite; every other repeated key collects values.
fn insert(flags: &mut Options, key: &str, value: Value) {
    match flags.get_mut(key) {
        Some(Value::Array(values)) => values.push(value),
        Some(existing) if !existing.is_boolean() => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        _ => {
            flags.insert(key.to_string(), value);
        }
    }
}
