//! Lazy external-tool resolution.
//!
//! Executables are resolved immediately before the stage that needs them,
//! never all up front, so an unselected backend's missing tool cannot block
//! a run that never invokes it.
use crate::error::PipelineError;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Resolve a configured tool entry to an existing executable path.
///
/// Entries containing a path separator are taken as filesystem paths and
/// checked directly; bare names are looked up on PATH.
pub fn resolve_tool(entry: &str, stage: &str) -> Result<PathBuf> {
    let path = Path::new(entry);
    if path.is_absolute() || entry.contains(std::path::MAIN_SEPARATOR) {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(missing(entry, stage, "no such file"));
    }
    which::which(entry).map_err(|err| missing(entry, stage, &err.to_string()))
}

fn missing(tool: &str, stage: &str, detail: &str) -> anyhow::Error {
    PipelineError::ToolMissing {
        tool: tool.to_string(),
        stage: stage.to_string(),
        detail: detail.to_string(),
    }
    .into()
}
