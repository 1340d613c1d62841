//! Pipeline controller: the ordered state machine driving the four stages.
//!
//! Stages execute strictly in sequence (extract, reconstruct, train,
//! export) because each stage's output is a filesystem artifact consumed
//! by the next. Failure at any stage is fatal: no transition happens, the
//! partial log and workspace stay on disk for diagnosis, and a later run
//! resumes via the skip/force policy rather than saved mid-stage state.
mod extract;
mod reconstruct;
mod train;

use crate::config::PipelineConfig;
use crate::context::{build_context, build_env_overlay, ExecutionContext};
use crate::exec::Executor;
use crate::layout::WorkspaceLayout;
use crate::manifest::{build_run_result, write_manifest, RunResult};
use crate::runlog::RunLog;
use anyhow::Result;

/// Run-level switches from the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Print every expanded command without spawning anything.
    pub dry_run: bool,
    /// Ignore skip-if-exists policies.
    pub force: bool,
    /// Stream subprocess output live in addition to capturing it.
    pub verbose: bool,
}

/// Mutable state threaded through the stages of one run.
pub(crate) struct Runner<'a> {
    pub(crate) config: &'a PipelineConfig,
    pub(crate) layout: &'a WorkspaceLayout,
    pub(crate) ctx: ExecutionContext,
    pub(crate) executor: Executor,
    pub(crate) log: RunLog,
    pub(crate) force: bool,
}

impl Runner<'_> {
    /// Execute one expanded command line with the run's policy and log.
    pub(crate) fn run_command(&mut self, stage: &str, command_line: &str) -> Result<()> {
        self.executor
            .run_stage(stage, command_line, &self.layout.root, &mut self.log)
    }

    /// Emit a stage-boundary status line to the console and the run log.
    pub(crate) fn status(&mut self, stage: &str, message: &str) -> Result<()> {
        eprintln!("{stage}: {message}");
        self.log.outcome(stage, message)
    }
}

/// Drive a full pipeline run and write the manifest on success.
pub fn run(config: &PipelineConfig, opts: &RunOptions) -> Result<RunResult> {
    let layout = WorkspaceLayout::plan(&config.project.working_dir, &config.reconstruct.database_name)?;
    let log = RunLog::create(&layout.logs_dir)?;
    tracing::info!(
        project = %config.project.name,
        backend = config.backend.as_str(),
        dry_run = opts.dry_run,
        "pipeline start"
    );

    let mut runner = Runner {
        config,
        layout: &layout,
        ctx: build_context(config, &layout),
        executor: Executor {
            dry_run: opts.dry_run,
            verbose: opts.verbose,
            env: build_env_overlay(&config.tools),
        },
        log,
        force: opts.force,
    };

    if let Err(err) = run_stages(&mut runner) {
        // Best-effort: the failure reaches the log before the process dies.
        let _ = runner.log.line(&format!("error: {err:#}"));
        return Err(err);
    }

    let result = build_run_result(config, &layout, runner.log.path());
    if opts.dry_run {
        runner.status("manifest", "dry-run, manifest not written")?;
    } else {
        write_manifest(&layout.manifest_path(), &result)?;
        runner.status(
            "manifest",
            &format!("wrote {}", layout.manifest_path().display()),
        )?;
    }
    Ok(result)
}

fn run_stages(runner: &mut Runner<'_>) -> Result<()> {
    extract::run(runner)?;
    reconstruct::run(runner)?;
    train::run_train(runner)?;
    train::run_export(runner)?;
    Ok(())
}
