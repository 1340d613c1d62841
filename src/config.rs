//! Pipeline configuration: loading, validation, and the template stub.
//!
//! Loading is two-phase: the raw JSONC document is checked for required keys
//! first (so errors name the missing key), then deserialized into typed
//! structs. The config is loaded once and never mutated.
use crate::error::PipelineError;
use crate::jsonc;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Closed set of training backends.
///
/// Dispatch on the backend is a tagged variant rather than a string match so
/// a missing arm is a compile error, not a runtime surprise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Inria,
    Nerfstudio,
    Opensplat,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Inria, Backend::Nerfstudio, Backend::Opensplat];

    /// Stable lowercase name used in config keys and the manifest.
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Inria => "inria",
            Backend::Nerfstudio => "nerfstudio",
            Backend::Opensplat => "opensplat",
        }
    }

    fn from_name(name: &str) -> Option<Backend> {
        Backend::ALL.iter().copied().find(|b| b.as_str() == name)
    }
}

/// Project identity and primary inputs.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub working_dir: PathBuf,
    pub video_path: PathBuf,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

/// External tool locations: absolute paths or PATH-relative names.
///
/// Backend launchers and the CUDA root are optional; they are resolved
/// lazily right before the stage that needs them, so an unselected backend's
/// missing tool never blocks a run.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    pub ffmpeg: String,
    pub colmap: String,
    #[serde(default)]
    pub inria: Option<String>,
    #[serde(default)]
    pub nerfstudio: Option<String>,
    #[serde(default)]
    pub opensplat: Option<String>,
    #[serde(default)]
    pub cuda_home: Option<PathBuf>,
}

impl ToolsConfig {
    /// Configured launcher for a backend, if any.
    pub fn backend_tool(&self, backend: Backend) -> Option<&str> {
        match backend {
            Backend::Inria => self.inria.as_deref(),
            Backend::Nerfstudio => self.nerfstudio.as_deref(),
            Backend::Opensplat => self.opensplat.as_deref(),
        }
    }
}

/// Frame-extraction settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default)]
    pub max_long_edge: Option<u32>,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_true")]
    pub skip_if_frames_exist: bool,
    #[serde(default)]
    pub transpose: Option<u32>,
}

/// Reconstruction mode: one combined COLMAP command or four explicit steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconstructMode {
    Automatic,
    Manual,
}

/// Reconstruction settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconstructConfig {
    #[serde(default = "default_mode")]
    pub mode: ReconstructMode,
    #[serde(default = "default_database_name")]
    pub database_name: String,
    #[serde(default = "default_true")]
    pub single_camera: bool,
    #[serde(default = "default_num_threads")]
    pub num_threads: i64,
    #[serde(default)]
    pub dense: bool,
    #[serde(default)]
    pub command_overrides: BTreeMap<String, String>,
}

/// One templated external command: template string, ordered argument map,
/// and an optional external args file merged over the inline map.
#[derive(Debug, Clone, Deserialize)]
pub struct StageSpec {
    pub template: String,
    #[serde(default)]
    pub args: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub args_file: Option<PathBuf>,
}

/// Per-backend stage definitions. `prepare` is absent for backends that
/// train directly on the reconstruction output.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendStages {
    #[serde(default)]
    pub prepare: Option<StageSpec>,
    pub train: StageSpec,
    pub export: StageSpec,
}

/// The full, validated pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub project: ProjectConfig,
    pub tools: ToolsConfig,
    pub backend: Backend,
    pub extract: ExtractConfig,
    pub reconstruct: ReconstructConfig,
    #[serde(default)]
    pub stages: BTreeMap<String, BackendStages>,
}

impl PipelineConfig {
    /// Stage definitions for the selected backend.
    pub fn stage_block(&self) -> Result<&BackendStages> {
        self.stages.get(self.backend.as_str()).ok_or_else(|| {
            PipelineError::Config(format!(
                "missing required key `stages.{}` for selected backend",
                self.backend.as_str()
            ))
            .into()
        })
    }
}

fn default_seed() -> u64 {
    42
}

fn default_fps() -> f64 {
    2.0
}

fn default_format() -> String {
    "jpg".to_string()
}

fn default_true() -> bool {
    true
}

fn default_database_name() -> String {
    "database.db".to_string()
}

fn default_mode() -> ReconstructMode {
    ReconstructMode::Automatic
}

fn default_num_threads() -> i64 {
    -1
}

/// Recognized keys in `reconstruct.command_overrides`.
pub const RECONSTRUCT_OVERRIDE_KEYS: [&str; 5] = [
    "automatic",
    "feature_extractor",
    "matcher",
    "mapper",
    "undistort",
];

/// Load and validate a pipeline configuration document.
///
/// Fails with a ConfigError before any directory is created or subprocess
/// spawned: missing keys are named, the backend must be a recognized value,
/// and the input video must exist on disk.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let raw = jsonc::read_value(path)?;
    validate_document(&raw)?;
    let config: PipelineConfig = serde_json::from_value(raw)
        .map_err(|err| PipelineError::Config(format!("invalid config {}: {err}", path.display())))?;
    validate_config(&config)?;
    Ok(config)
}

/// Check required keys on the raw document so errors name the key.
fn validate_document(raw: &serde_json::Value) -> Result<()> {
    for key in ["project", "tools", "backend", "extract", "reconstruct"] {
        require_key(raw, key)?;
    }
    for key in ["project.name", "project.working_dir", "project.video_path"] {
        require_key(raw, key)?;
    }
    for key in ["tools.ffmpeg", "tools.colmap"] {
        require_key(raw, key)?;
    }

    let backend = raw["backend"]
        .as_str()
        .ok_or_else(|| PipelineError::Config("`backend` must be a string".to_string()))?;
    if Backend::from_name(backend).is_none() {
        let expected: Vec<&str> = Backend::ALL.iter().map(|b| b.as_str()).collect();
        return Err(PipelineError::Config(format!(
            "unknown backend `{backend}` (expected one of: {})",
            expected.join(", ")
        ))
        .into());
    }
    Ok(())
}

fn require_key(raw: &serde_json::Value, dotted: &str) -> Result<()> {
    let mut current = raw;
    for part in dotted.split('.') {
        match current.get(part) {
            Some(value) if !value.is_null() => current = value,
            _ => {
                return Err(
                    PipelineError::Config(format!("missing required key `{dotted}`")).into(),
                )
            }
        }
    }
    Ok(())
}

/// Semantic validation of the typed config.
fn validate_config(config: &PipelineConfig) -> Result<()> {
    if !config.project.video_path.exists() {
        return Err(config_err(format!(
            "video path does not exist: {}",
            config.project.video_path.display()
        )));
    }
    if config.extract.fps <= 0.0 {
        return Err(config_err(format!(
            "extract.fps must be positive (got {})",
            config.extract.fps
        )));
    }
    if config.extract.max_long_edge == Some(0) {
        return Err(config_err("extract.max_long_edge must be positive".into()));
    }
    if let Some(transpose) = config.extract.transpose {
        if transpose > 3 {
            return Err(config_err(format!(
                "extract.transpose must be 0-3 (got {transpose})"
            )));
        }
    }
    if config.extract.format.trim().is_empty() {
        return Err(config_err("extract.format must be non-empty".into()));
    }
    if config.reconstruct.database_name.trim().is_empty() {
        return Err(config_err("reconstruct.database_name must be non-empty".into()));
    }
    for key in config.reconstruct.command_overrides.keys() {
        if !RECONSTRUCT_OVERRIDE_KEYS.contains(&key.as_str()) {
            return Err(config_err(format!(
                "unknown reconstruct.command_overrides key `{key}` (expected one of: {})",
                RECONSTRUCT_OVERRIDE_KEYS.join(", ")
            )));
        }
    }
    // The selected backend must have stage definitions up front; other
    // backends' entries are never touched.
    config.stage_block()?;
    Ok(())
}

fn config_err(message: String) -> anyhow::Error {
    PipelineError::Config(message).into()
}

/// Commented configuration template written by `init-config`.
pub fn config_stub() -> &'static str {
    r#"{
  // vid2splat pipeline configuration.
  //
  // The pipeline runs extract -> reconstruct -> train -> export for one
  // video on one machine. The working directory is owned by a single run at
  // a time; concurrent runs against it are not supported.
  "project": {
    "name": "garden",
    "working_dir": "runs/garden",
    "video_path": "input/garden.mp4",
    "seed": 42
  },
  "tools": {
    "ffmpeg": "ffmpeg",
    "colmap": "colmap",
    // Launchers for the training backends. Entries for backends you do not
    // select may be null; a tool is only resolved when its stage runs.
    "inria": "python",
    "nerfstudio": null,
    "opensplat": null,
    // Optional CUDA toolkit root, exported to every subprocess when set.
    "cuda_home": null
  },
  // One of: "inria", "nerfstudio", "opensplat".
  "backend": "inria",
  "extract": {
    "fps": 2.0,
    // Bound the long edge of extracted frames, preserving aspect ratio.
    // Null keeps the source resolution.
    "max_long_edge": 1600,
    "format": "jpg",
    // Skip extraction when frames/ already holds matching files. The check
    // is presence-only: frames left over from different settings are reused
    // as-is. Re-run with --force to extract again.
    "skip_if_frames_exist": true,
    // Optional ffmpeg transpose value (0-3) for rotated footage.
    "transpose": null
  },
  "reconstruct": {
    // "automatic" runs COLMAP's automatic_reconstructor; "manual" runs
    // feature extraction, matching, and mapping as separate commands.
    "mode": "automatic",
    "database_name": "database.db",
    "single_camera": true,
    "num_threads": -1,
    "dense": false,
    // Override individual sub-step command templates. Recognized keys:
    // automatic, feature_extractor, matcher, mapper, undistort.
    // Unresolved {placeholders} in overrides pass through unchanged.
    "command_overrides": {}
  },
  // Per-backend stage definitions. Argument values support {placeholders};
  // boolean true emits a bare --flag, false/null emits nothing. An optional
  // "args_file" points at a JSONC file whose keys override the inline args.
  "stages": {
    "inria": {
      "prepare": null,
      "train": {
        "template": "{tool} train.py -s {undistorted_dir} -m {model_dir}",
        "args": {
          "iterations": 30000,
          "seed": "{seed}"
        },
        "args_file": null
      },
      "export": {
        "template": "{tool} export_ply.py -m {model_dir} -o {output_file}",
        "args": {},
        "args_file": null
      }
    },
    "nerfstudio": {
      "prepare": {
        "template": "ns-process-data images --data {undistorted_dir} --output-dir {train_dir} --skip-colmap --colmap-model-path {sparse_dir}/0",
        "args": {},
        "args_file": null
      },
      "train": {
        "template": "{tool} splatfacto --data {train_dir} --output-dir {model_dir}",
        "args": {
          "machine.seed": "{seed}"
        },
        "args_file": null
      },
      "export": {
        "template": "ns-export gaussian-splat --load-config {model_dir}/config.yml --output-dir {output_dir}",
        "args": {},
        "args_file": null
      }
    },
    "opensplat": {
      "prepare": null,
      "train": {
        "template": "{tool} {undistorted_dir} -o {model_dir}/splat.ply",
        "args": {
          "num-iters": 30000
        },
        "args_file": null
      },
      "export": {
        "template": "cp {model_dir}/splat.ply {output_file}",
        "args": {},
        "args_file": null
      }
    }
  }
}
"#
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
