//! Stage executor: one external command per call.
//!
//! Handles dry-run short-circuiting, lazy tool resolution, concurrent
//! draining of both output streams, capture-to-log, and fatal-on-nonzero
//! exit semantics. Both pipes are drained on dedicated threads; reading
//! them sequentially would deadlock as soon as a subprocess fills the
//! unread pipe's buffer.
use crate::context::EnvOverlay;
use crate::error::PipelineError;
use crate::runlog::RunLog;
use crate::template::split_command_line;
use crate::tools::resolve_tool;
use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;

/// Execution policy shared by every stage of one run.
pub struct Executor {
    pub dry_run: bool,
    pub verbose: bool,
    pub env: EnvOverlay,
}

impl Executor {
    /// Run one fully-expanded command line for a named stage.
    ///
    /// In dry-run mode the command is logged in the exact format of a real
    /// run and nothing is spawned. A nonzero exit is fatal and carries the
    /// stage name and exit code; the full output is already in the log by
    /// the time the error propagates.
    pub fn run_stage(
        &self,
        stage: &str,
        command_line: &str,
        cwd: &Path,
        log: &mut RunLog,
    ) -> Result<()> {
        log.command(stage, command_line)?;
        eprintln!("{stage}: $ {command_line}");
        if self.dry_run {
            log.outcome(stage, "dry-run, not executed")?;
            return Ok(());
        }

        let argv = split_command_line(command_line)?;
        let program = resolve_tool(&argv[0], stage)?;

        let mut command = Command::new(&program);
        command
            .args(&argv[1..])
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (name, value) in self.env.iter() {
            command.env(name, value);
        }

        let mut child = command.spawn().map_err(|err| {
            PipelineError::Io(format!("spawn {stage} ({}): {err}", program.display()))
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PipelineError::Io(format!("no stdout pipe for {stage}")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| PipelineError::Io(format!("no stderr pipe for {stage}")))?;

        let stdout_drain = drain(stdout, self.verbose, false);
        let stderr_drain = drain(stderr, self.verbose, true);

        let status = child
            .wait()
            .map_err(|err| PipelineError::Io(format!("wait for {stage}: {err}")))
            .with_context(|| format!("stage {stage}"))?;
        let stdout_text = stdout_drain.join().unwrap_or_default();
        let stderr_text = stderr_drain.join().unwrap_or_default();

        log.output(stage, &stdout_text, &stderr_text)?;
        tracing::debug!(stage, code = ?status.code(), "stage process exited");

        if !status.success() {
            let code = status.code().unwrap_or(-1);
            log.outcome(stage, &format!("failed with status {code}"))?;
            return Err(PipelineError::Process {
                stage: stage.to_string(),
                code,
            }
            .into());
        }
        log.outcome(stage, "ok")?;
        Ok(())
    }
}

/// Drain a subprocess stream on its own thread.
///
/// Captures every byte (lossy UTF-8 at the end, never truncated) and
/// optionally echoes lines to the console as they arrive.
fn drain<R: Read + Send + 'static>(stream: R, echo: bool, to_stderr: bool) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut captured: Vec<u8> = Vec::new();
        let mut chunk: Vec<u8> = Vec::new();
        loop {
            chunk.clear();
            match reader.read_until(b'\n', &mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if echo {
                        let line = String::from_utf8_lossy(&chunk);
                        let line = line.trim_end_matches('\n');
                        if to_stderr {
                            eprintln!("{line}");
                        } else {
                            println!("{line}");
                        }
                    }
                    captured.extend_from_slice(&chunk);
                }
            }
        }
        String::from_utf8_lossy(&captured).into_owned()
    })
}
