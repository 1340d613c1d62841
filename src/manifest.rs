//! Final run manifest.
//!
//! Written once, only after every stage succeeded, to a fixed path inside
//! the output area. Always overwrites the previous run's manifest; there is
//! no merge or partial-success state.
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::layout::WorkspaceLayout;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Record of one fully successful run: resolved paths and pipeline choice.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunResult {
    pub project: String,
    pub backend: String,
    pub working_dir: String,
    pub frames_dir: String,
    pub colmap_dir: String,
    pub sparse_dir: String,
    pub undistorted_dir: String,
    pub train_dir: String,
    pub model_dir: String,
    pub output_dir: String,
    pub output_file: String,
    pub log_file: String,
}

/// Assemble the manifest from the run's resolved state.
pub fn build_run_result(
    config: &PipelineConfig,
    layout: &WorkspaceLayout,
    log_file: &Path,
) -> RunResult {
    RunResult {
        project: config.project.name.clone(),
        backend: config.backend.as_str().to_string(),
        working_dir: layout.root.display().to_string(),
        frames_dir: layout.frames_dir.display().to_string(),
        colmap_dir: layout.colmap_dir.display().to_string(),
        sparse_dir: layout.sparse_dir.display().to_string(),
        undistorted_dir: layout.undistorted_dir.display().to_string(),
        train_dir: layout.train_dir.display().to_string(),
        model_dir: layout.model_dir.display().to_string(),
        output_dir: layout.output_dir.display().to_string(),
        output_file: layout.output_file(&config.project.name).display().to_string(),
        log_file: log_file.display().to_string(),
    }
}

/// Serialize the manifest to its fixed location, overwriting any prior one.
pub fn write_manifest(path: &Path, result: &RunResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)
        .map_err(|err| PipelineError::Io(format!("serialize manifest: {err}")))?;
    std::fs::write(path, json)
        .map_err(|err| PipelineError::Io(format!("write {}: {err}", path.display())))?;
    Ok(())
}
