//! vid2splat: turn a video into a Gaussian-splat point cloud by driving
//! ffmpeg, COLMAP, and a selectable training backend as subprocesses.
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod context;
mod error;
mod exec;
mod jsonc;
mod layout;
mod manifest;
mod pipeline;
mod runlog;
mod template;
mod tools;

use error::{PipelineError, EXIT_FAILURE};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = cli::RootArgs::parse();
    let outcome = match args.command {
        cli::Command::Run(args) => cmd_run(&args),
        cli::Command::InitConfig(args) => cmd_init_config(&args),
    };

    if let Err(err) = outcome {
        eprintln!("error: {err:#}");
        std::process::exit(exit_code(&err));
    }
}

/// Map a failure to the exit-code taxonomy; 0 stays reserved for success.
fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<PipelineError>()
        .map_or(EXIT_FAILURE, PipelineError::exit_code)
}

fn cmd_run(args: &cli::RunArgs) -> Result<()> {
    let config = config::load_config(&args.config)?;
    let opts = pipeline::RunOptions {
        dry_run: args.dry_run,
        force: args.force,
        verbose: args.verbose,
    };
    let result = pipeline::run(&config, &opts)?;
    if opts.dry_run {
        eprintln!("run: dry-run complete ({} backend)", result.backend);
    } else {
        eprintln!("run: complete, splat at {}", result.output_file);
    }
    Ok(())
}

fn cmd_init_config(args: &cli::InitConfigArgs) -> Result<()> {
    if args.out.exists() {
        return Err(PipelineError::Io(format!(
            "refusing to overwrite existing file {}",
            args.out.display()
        ))
        .into());
    }
    std::fs::write(&args.out, config::config_stub())
        .map_err(|err| PipelineError::Io(format!("write {}: {err}", args.out.display())))?;
    eprintln!("init-config: wrote template to {}", args.out.display());
    Ok(())
}
