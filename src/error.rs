//! Error taxonomy for the pipeline.
//!
//! Every failure is fatal to the run; the enum exists so the CLI can map
//! each kind to a stable exit code and so callers can assert on the kind
//! without string matching. Workflow code still layers `anyhow` context on
//! top and the binary downcasts at the boundary.
use thiserror::Error;

// Exit code 0 is reserved exclusively for a fully successful run.
/// Exit code for any failure without a more specific kind.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for configuration errors.
pub const EXIT_CONFIG: i32 = 2;
/// Exit code for a missing external tool.
pub const EXIT_TOOL_MISSING: i32 = 3;
/// Exit code for a stage subprocess exiting nonzero.
pub const EXIT_STAGE_FAILED: i32 = 4;

/// Closed set of failure kinds a run can terminate with.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed or missing configuration, including invalid enumerated values.
    #[error("config error: {0}")]
    Config(String),

    /// A required input path is missing or a directory could not be created.
    #[error("path error: {0}")]
    Path(String),

    /// An executable referenced by the stage about to run cannot be located.
    #[error("tool `{tool}` for stage `{stage}` not found: {detail}")]
    ToolMissing {
        tool: String,
        stage: String,
        detail: String,
    },

    /// A stage subprocess exited nonzero.
    #[error("stage `{stage}` exited with status {code}")]
    Process { stage: String, code: i32 },

    /// Manifest or argument-file read/write failure.
    #[error("io error: {0}")]
    Io(String),
}

impl PipelineError {
    /// Map the error kind to its process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Config(_) => EXIT_CONFIG,
            PipelineError::ToolMissing { .. } => EXIT_TOOL_MISSING,
            PipelineError::Process { .. } => EXIT_STAGE_FAILED,
            PipelineError::Path(_) | PipelineError::Io(_) => EXIT_FAILURE,
        }
    }
}
