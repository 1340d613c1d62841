//! Execution context and subprocess environment overlay.
//!
//! Both are built once per run and threaded explicitly into every component
//! that needs them; nothing reads ambient process state mid-run.
use crate::config::{PipelineConfig, ToolsConfig};
use crate::layout::WorkspaceLayout;
use std::collections::BTreeMap;

/// Placeholder name → resolved string value, used to expand every template.
///
/// Stage-local additions (e.g. the derived ffmpeg filter chain) go through
/// [`ExecutionContext::with`], which clones rather than mutates so no stage
/// leaks placeholders into the next.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    values: BTreeMap<String, String>,
}

impl ExecutionContext {
    /// Resolved value for a placeholder name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_string(), value.into());
    }

    /// Clone the context extended with stage-local placeholders.
    pub fn with(&self, extra: &[(&str, String)]) -> ExecutionContext {
        let mut next = self.clone();
        for (name, value) in extra {
            next.set(name, value.clone());
        }
        next
    }
}

/// Build the per-run context from config and the planned layout.
pub fn build_context(config: &PipelineConfig, layout: &WorkspaceLayout) -> ExecutionContext {
    let mut ctx = ExecutionContext::default();
    ctx.set("project_name", config.project.name.clone());
    ctx.set("working_dir", layout.root.display().to_string());
    ctx.set("video_path", config.project.video_path.display().to_string());
    ctx.set("frames_dir", layout.frames_dir.display().to_string());
    ctx.set("colmap_dir", layout.colmap_dir.display().to_string());
    ctx.set("sparse_dir", layout.sparse_dir.display().to_string());
    ctx.set(
        "undistorted_dir",
        layout.undistorted_dir.display().to_string(),
    );
    ctx.set("database_path", layout.database_path.display().to_string());
    ctx.set("train_dir", layout.train_dir.display().to_string());
    ctx.set("model_dir", layout.model_dir.display().to_string());
    ctx.set("output_dir", layout.output_dir.display().to_string());
    ctx.set(
        "output_file",
        layout.output_file(&config.project.name).display().to_string(),
    );
    ctx.set("seed", config.project.seed.to_string());
    ctx.set("ffmpeg", config.tools.ffmpeg.clone());
    ctx.set("colmap", config.tools.colmap.clone());
    ctx
}

/// Environment variables overlaid on every subprocess.
///
/// Captured once at startup so the overlay is identical for every stage:
/// CUDA paths when an accelerator root is configured, passthrough of a
/// pre-existing device selection, and fixed text-encoding variables to keep
/// subprocess I/O interpretation deterministic across locales.
#[derive(Debug, Clone, Default)]
pub struct EnvOverlay {
    vars: BTreeMap<String, String>,
}

impl EnvOverlay {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

/// Build the subprocess environment overlay from tool configuration.
pub fn build_env_overlay(tools: &ToolsConfig) -> EnvOverlay {
    let mut vars = BTreeMap::new();
    vars.insert("PYTHONIOENCODING".to_string(), "utf-8".to_string());
    vars.insert("LC_ALL".to_string(), "C.UTF-8".to_string());

    if let Some(cuda_home) = &tools.cuda_home {
        vars.insert("CUDA_HOME".to_string(), cuda_home.display().to_string());
        let cuda_bin = cuda_home.join("bin").display().to_string();
        let path = match std::env::var("PATH") {
            Ok(existing) => format!("{cuda_bin}:{existing}"),
            Err(_) => cuda_bin,
        };
        vars.insert("PATH".to_string(), path);
        let cuda_lib = cuda_home.join("lib64").display().to_string();
        let ld_path = match std::env::var("LD_LIBRARY_PATH") {
            Ok(existing) => format!("{cuda_lib}:{existing}"),
            Err(_) => cuda_lib,
        };
        vars.insert("LD_LIBRARY_PATH".to_string(), ld_path);
    }

    if let Ok(devices) = std::env::var("CUDA_VISIBLE_DEVICES") {
        vars.insert("CUDA_VISIBLE_DEVICES".to_string(), devices);
    }

    EnvOverlay { vars }
}
