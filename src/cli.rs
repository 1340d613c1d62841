//! CLI argument parsing for the pipeline orchestrator.
//!
//! The CLI is intentionally thin: it routes to the pipeline engine without
//! embedding policy, so the same engine drives tests and the binary alike.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "vid2splat",
    version,
    about = "Video to Gaussian-splat pipeline orchestrator",
    after_help = "Commands:\n  run --config <FILE>        Run extract -> reconstruct -> train -> export\n  init-config --out <FILE>   Write a commented configuration template\n\nExamples:\n  vid2splat init-config --out garden.jsonc\n  vid2splat run --config garden.jsonc --dry-run\n  vid2splat run --config garden.jsonc --verbose\n  vid2splat run --config garden.jsonc --force",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Run(RunArgs),
    InitConfig(InitConfigArgs),
}

/// Inputs for one pipeline run.
#[derive(Parser, Debug)]
#[command(about = "Run the full pipeline for one video")]
pub struct RunArgs {
    /// Pipeline configuration document (JSON, // and /* */ comments allowed)
    #[arg(long, value_name = "FILE")]
    pub config: PathBuf,

    /// Print every expanded command without executing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Ignore skip-if-exists policies and re-run every stage
    #[arg(long)]
    pub force: bool,

    /// Stream subprocess output live (output is always captured to the run log)
    #[arg(long)]
    pub verbose: bool,
}

/// Inputs for writing the configuration template.
#[derive(Parser, Debug)]
#[command(about = "Write a commented configuration template and exit")]
pub struct InitConfigArgs {
    /// Destination path; must not already exist
    #[arg(long, value_name = "FILE")]
    pub out: PathBuf,
}
