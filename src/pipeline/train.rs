//! Training and export dispatch on the selected backend.
//!
//! Each backend carries its own stage specs from the config. Backends with
//! a `prepare` block run it before training; the others train directly on
//! the reconstruction output. Seed and path placeholders in arg maps
//! resolve at dispatch time, so one template works across runs.
use super::Runner;
use crate::config::StageSpec;
use crate::context::ExecutionContext;
use crate::error::PipelineError;
use crate::template::build_command_line;
use anyhow::Result;

pub(super) fn run_train(runner: &mut Runner<'_>) -> Result<()> {
    let config = runner.config;
    let stages = config.stage_block()?;
    if let Some(prepare) = &stages.prepare {
        run_stage_spec(runner, "prepare", prepare)?;
    }
    run_stage_spec(runner, "train", &stages.train)
}

pub(super) fn run_export(runner: &mut Runner<'_>) -> Result<()> {
    let config = runner.config;
    let stages = config.stage_block()?;
    run_stage_spec(runner, "export", &stages.export)
}

fn run_stage_spec(runner: &mut Runner<'_>, stage: &str, spec: &StageSpec) -> Result<()> {
    let ctx = backend_ctx(runner, stage)?;
    let command = build_command_line(spec, &ctx)?;
    runner.run_command(stage, &command)
}

/// Extend the run context with the backend's launcher under `{tool}`.
///
/// A null tool entry is only an error when the stage will actually spawn;
/// in dry-run mode the placeholder passes through so the printed plan still
/// shows where the launcher would go.
fn backend_ctx(runner: &Runner<'_>, stage: &str) -> Result<ExecutionContext> {
    let backend = runner.config.backend;
    match runner.config.tools.backend_tool(backend) {
        Some(tool) => Ok(runner.ctx.with(&[("tool", tool.to_string())])),
        None if runner.executor.dry_run => Ok(runner.ctx.clone()),
        None => Err(PipelineError::ToolMissing {
            tool: backend.as_str().to_string(),
            stage: stage.to_string(),
            detail: "no launcher configured for selected backend".to_string(),
        }
        .into()),
    }
}
