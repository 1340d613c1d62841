//! Command-template expansion.
//!
//! Two separate responsibilities: substituting `{placeholder}` tokens from
//! the execution context, and flattening ordered argument maps into CLI flag
//! strings. Substitution is literal and single-pass; placeholder values are
//! never re-scanned, so expansion cannot loop or inject new placeholders.
use crate::config::StageSpec;
use crate::context::ExecutionContext;
use crate::error::PipelineError;
use crate::jsonc;
use anyhow::Result;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_.]*)\}").expect("placeholder regex"))
}

/// Replace every `{name}` token that resolves in the context.
///
/// Unresolved placeholders pass through byte-for-byte: partially-specialized
/// templates and forward-compatible custom placeholders are not errors.
pub fn expand_placeholders(template: &str, ctx: &ExecutionContext) -> String {
    placeholder_re()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            match ctx.get(&caps[1]) {
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Flatten an ordered argument map into a CLI flag string.
///
/// `true` emits a bare `--name`; `false`, null, and values that expand to
/// the empty string emit nothing; anything else emits `--name value` with
/// the value quoted when it contains whitespace or quote characters.
/// Emission order follows the map's insertion order.
pub fn flatten_args(
    args: &serde_json::Map<String, serde_json::Value>,
    ctx: &ExecutionContext,
) -> Result<String> {
    let mut parts: Vec<String> = Vec::new();
    for (name, value) in args {
        match value {
            serde_json::Value::Bool(true) => parts.push(format!("--{name}")),
            serde_json::Value::Bool(false) | serde_json::Value::Null => {}
            serde_json::Value::String(raw) => {
                let expanded = expand_placeholders(raw, ctx);
                if !expanded.is_empty() {
                    parts.push(format!("--{name} {}", quote_value(&expanded)));
                }
            }
            serde_json::Value::Number(number) => {
                parts.push(format!("--{name} {number}"));
            }
            other => {
                return Err(PipelineError::Config(format!(
                    "unsupported value for argument `{name}`: {other}"
                ))
                .into())
            }
        }
    }
    Ok(parts.join(" "))
}

/// Double-quote a value when it would otherwise split or lose quotes.
fn quote_value(value: &str) -> String {
    if value
        .chars()
        .any(|ch| ch.is_whitespace() || ch == '"')
    {
        format!("\"{}\"", value.replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// Merge an external args file over an inline argument map.
///
/// File values override inline values on key collision; keys only present
/// in the file are appended in file order. The inline map is cloned, never
/// mutated, so repeated stage invocations see the same starting point.
pub fn merge_args_file(
    inline: &serde_json::Map<String, serde_json::Value>,
    args_file: &Path,
) -> Result<serde_json::Map<String, serde_json::Value>> {
    if !args_file.is_file() {
        return Err(PipelineError::Io(format!(
            "args file does not exist: {}",
            args_file.display()
        ))
        .into());
    }
    let value = jsonc::read_value(args_file)?;
    let overrides = match value {
        serde_json::Value::Object(map) => map,
        other => {
            return Err(PipelineError::Config(format!(
                "args file {} must contain a JSON object, got {other}",
                args_file.display()
            ))
            .into())
        }
    };
    let mut merged = inline.clone();
    for (name, value) in overrides {
        merged.insert(name, value);
    }
    Ok(merged)
}

/// Build the full command line for a stage spec: expanded template plus the
/// flattened (and possibly file-merged) argument map.
pub fn build_command_line(spec: &StageSpec, ctx: &ExecutionContext) -> Result<String> {
    let merged;
    let args = match &spec.args_file {
        Some(path) => {
            merged = merge_args_file(&spec.args, path)?;
            &merged
        }
        None => &spec.args,
    };
    let command = expand_placeholders(&spec.template, ctx);
    let flags = flatten_args(args, ctx)?;
    if flags.is_empty() {
        Ok(command)
    } else {
        Ok(format!("{command} {flags}"))
    }
}

/// Split an expanded command line into argv, honoring quotes.
pub fn split_command_line(command: &str) -> Result<Vec<String>> {
    let argv = shell_words::split(command)
        .map_err(|err| PipelineError::Config(format!("parse command `{command}`: {err}")))?;
    if argv.is_empty() {
        return Err(PipelineError::Config(format!("empty command: `{command}`")).into());
    }
    Ok(argv)
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
