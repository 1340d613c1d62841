//! Per-run append-only log file.
//!
//! One log per run under `logs/`, written by exactly one stage at a time.
//! Every stage boundary, full command line, and captured subprocess output
//! lands here regardless of console verbosity, so a failed run can be
//! diagnosed without re-running.
use crate::error::PipelineError;
use anyhow::Result;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Append-only run log.
pub struct RunLog {
    path: PathBuf,
    file: File,
}

impl RunLog {
    /// Create a timestamped log file under the log directory.
    pub fn create(logs_dir: &Path) -> Result<RunLog> {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| PipelineError::Io(format!("compute timestamp: {err}")))?
            .as_millis();
        let path = logs_dir.join(format!("run-{stamp}.log"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| PipelineError::Io(format!("open log {}: {err}", path.display())))?;
        let mut log = RunLog { path, file };
        log.line(&format!("run started at epoch-ms {stamp}"))?;
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line.
    pub fn line(&mut self, text: &str) -> Result<()> {
        self.file
            .write_all(text.as_bytes())
            .and_then(|()| self.file.write_all(b"\n"))
            .map_err(|err| {
                PipelineError::Io(format!("append log {}: {err}", self.path.display())).into()
            })
    }

    /// Record the exact command a stage is about to run (or would run, in
    /// dry-run mode; the format is identical so logs diff cleanly).
    pub fn command(&mut self, stage: &str, command_line: &str) -> Result<()> {
        self.line(&format!("[{stage}] $ {command_line}"))
    }

    /// Record a stage outcome line.
    pub fn outcome(&mut self, stage: &str, text: &str) -> Result<()> {
        self.line(&format!("[{stage}] {text}"))
    }

    /// Record full captured output of a finished stage.
    pub fn output(&mut self, stage: &str, stdout: &str, stderr: &str) -> Result<()> {
        if !stdout.is_empty() {
            self.line(&format!("[{stage}] stdout:"))?;
            self.line(stdout.trim_end_matches('\n'))?;
        }
        if !stderr.is_empty() {
            self.line(&format!("[{stage}] stderr:"))?;
            self.line(stderr.trim_end_matches('\n'))?;
        }
        Ok(())
    }
}
