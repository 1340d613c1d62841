//! Workspace directory planning.
//!
//! Centralizing path derivation keeps the on-disk layout consistent across
//! stages and guarantees every path entering the execution context is
//! absolute, so relative-path ambiguity cannot leak into expanded commands.
use crate::error::PipelineError;
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// The set of directories one pipeline run works in, all absolute.
#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    pub root: PathBuf,
    pub frames_dir: PathBuf,
    pub colmap_dir: PathBuf,
    pub sparse_dir: PathBuf,
    pub undistorted_dir: PathBuf,
    pub database_path: PathBuf,
    pub train_dir: PathBuf,
    pub model_dir: PathBuf,
    pub output_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl WorkspaceLayout {
    /// Derive and create the layout under the working-directory root.
    ///
    /// Creation is idempotent: re-running over a populated working directory
    /// neither fails nor clears existing contents. Parent directories are
    /// created before children.
    pub fn plan(working_dir: &Path, database_name: &str) -> Result<WorkspaceLayout> {
        create_dir(working_dir)?;
        let root = working_dir.canonicalize().map_err(|err| {
            PipelineError::Path(format!("resolve {}: {err}", working_dir.display()))
        })?;

        let layout = WorkspaceLayout {
            frames_dir: root.join("frames"),
            colmap_dir: root.join("colmap"),
            sparse_dir: root.join("colmap").join("sparse"),
            undistorted_dir: root.join("colmap").join("undistorted"),
            database_path: root.join("colmap").join(database_name),
            train_dir: root.join("train"),
            model_dir: root.join("train").join("model"),
            output_dir: root.join("output"),
            logs_dir: root.join("logs"),
            root,
        };

        for dir in [
            &layout.frames_dir,
            &layout.colmap_dir,
            &layout.sparse_dir,
            &layout.undistorted_dir,
            &layout.train_dir,
            &layout.model_dir,
            &layout.output_dir,
            &layout.logs_dir,
        ] {
            create_dir(dir)?;
        }
        Ok(layout)
    }

    /// Fixed manifest location inside the output area.
    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir.join("manifest.json")
    }

    /// Deterministic final artifact path derived from the project name.
    pub fn output_file(&self, project_name: &str) -> PathBuf {
        self.output_dir.join(format!("{project_name}_gaussians.ply"))
    }
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|err| path_err(path, &err))?;
    Ok(())
}

fn path_err(path: &Path, err: &std::io::Error) -> anyhow::Error {
    PipelineError::Path(format!("create {}: {err}", path.display())).into()
}
