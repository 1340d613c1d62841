//! Comment-tolerant JSON loading.
//!
//! Config documents allow `//` line comments and `/* */` block comments.
//! They are stripped with a small scanner before the text reaches serde, so
//! the parser itself stays a plain `serde_json`. String literals are tracked
//! so comment-like sequences inside them survive untouched.
use crate::error::PipelineError;
use anyhow::{Context, Result};
use std::path::Path;

/// Strip `//` and `/* */` comments from a JSON document.
///
/// Newlines inside comments are preserved so serde error positions still
/// point at the right line of the original document.
pub fn strip_comments(input: &str) -> String {
    enum State {
        Normal,
        InString,
        InLineComment,
        InBlockComment,
    }

    let mut out = String::with_capacity(input.len());
    let mut state = State::Normal;
    let mut chars = input.chars().peekable();
    let mut escaped = false;

    while let Some(ch) = chars.next() {
        match state {
            State::Normal => match ch {
                '"' => {
                    state = State::InString;
                    escaped = false;
                    out.push(ch);
                }
                '/' => match chars.peek() {
                    Some('/') => {
                        chars.next();
                        state = State::InLineComment;
                    }
                    Some('*') => {
                        chars.next();
                        state = State::InBlockComment;
                    }
                    _ => out.push(ch),
                },
                _ => out.push(ch),
            },
            State::InString => {
                out.push(ch);
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == '"' {
                    state = State::Normal;
                }
            }
            State::InLineComment => {
                if ch == '\n' {
                    out.push(ch);
                    state = State::Normal;
                }
            }
            State::InBlockComment => {
                if ch == '\n' {
                    out.push(ch);
                } else if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Normal;
                }
            }
        }
    }

    out
}

/// Read a JSONC file into a `serde_json::Value`.
pub fn read_value(path: &Path) -> Result<serde_json::Value> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| PipelineError::Io(format!("read {}: {err}", path.display())))?;
    let stripped = strip_comments(&text);
    let value = serde_json::from_str(&stripped)
        .map_err(|err| PipelineError::Config(format!("parse {}: {err}", path.display())))
        .with_context(|| format!("load {}", path.display()))?;
    Ok(value)
}
