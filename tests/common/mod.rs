//! Shared test infrastructure for integration tests.
//!
//! Pipelines are exercised end-to-end against fake external tools: small
//! shell scripts that append their invocation to a shared call log and exit
//! with a scripted status. Assertions run on the call log, the run log, and
//! the manifest.

use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// One isolated pipeline workspace with fake tools.
pub struct Fixture {
    temp: TempDir,
    calls: PathBuf,
}

impl Fixture {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Fixture {
        let temp = TempDir::new().expect("tempdir");
        let calls = temp.path().join("calls.log");
        Fixture { temp, calls }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn working_dir(&self) -> PathBuf {
        self.root().join("work")
    }

    /// Write a fake tool that records its argv and exits 0.
    pub fn fake_tool(&self, name: &str) -> PathBuf {
        self.fake_tool_with(name, "exit 0")
    }

    /// Write a fake tool that records its argv, then runs `tail`.
    pub fn fake_tool_with(&self, name: &str, tail: &str) -> PathBuf {
        let path = self.root().join(name);
        let script = format!(
            "#!/bin/sh\necho {name} \"$@\" >> \"{calls}\"\n{tail}\n",
            calls = self.calls.display()
        );
        fs::write(&path, script).expect("write fake tool");
        make_executable(&path);
        path
    }

    /// Create the input video file the config points at.
    pub fn touch_video(&self) -> PathBuf {
        let path = self.root().join("input.mp4");
        fs::write(&path, b"not really a video").expect("write video");
        path
    }

    /// A complete valid config using fake ffmpeg/colmap/trainer tools.
    pub fn base_config(&self, mode: &str) -> serde_json::Value {
        let ffmpeg = self.fake_tool("ffmpeg");
        let colmap = self.fake_tool("colmap");
        let trainer = self.fake_tool("trainer");
        let video = self.touch_video();
        json!({
            "project": {
                "name": "garden",
                "working_dir": self.working_dir(),
                "video_path": video,
                "seed": 42
            },
            "tools": {
                "ffmpeg": ffmpeg,
                "colmap": colmap,
                "inria": trainer
            },
            "backend": "inria",
            "extract": { "fps": 2.0, "format": "jpg" },
            "reconstruct": { "mode": mode },
            "stages": {
                "inria": {
                    "train": {
                        "template": "{tool} train.py -s {undistorted_dir} -m {model_dir}",
                        "args": { "seed": "{seed}" }
                    },
                    "export": {
                        "template": "{tool} export.py -m {model_dir} -o {output_file}",
                        "args": {}
                    }
                }
            }
        })
    }

    pub fn write_config(&self, value: &serde_json::Value) -> PathBuf {
        let path = self.root().join("config.jsonc");
        fs::write(&path, serde_json::to_string_pretty(value).expect("serialize config"))
            .expect("write config");
        path
    }

    /// Recorded tool invocations, one line per spawn, in order.
    pub fn calls(&self) -> Vec<String> {
        if !self.calls.exists() {
            return Vec::new();
        }
        fs::read_to_string(&self.calls)
            .expect("read calls log")
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Run the vid2splat binary with the given arguments.
    pub fn run_cli(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_vid2splat"))
            .args(args)
            .current_dir(self.root())
            .output()
            .expect("run vid2splat")
    }

    /// Contents of the single run log under `work/logs/`.
    pub fn run_log(&self) -> String {
        let logs_dir = self.working_dir().join("logs");
        let mut entries: Vec<PathBuf> = fs::read_dir(&logs_dir)
            .expect("read logs dir")
            .map(|entry| entry.expect("log entry").path())
            .collect();
        entries.sort();
        let last = entries.last().expect("at least one run log");
        fs::read_to_string(last).expect("read run log")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.working_dir().join("output").join("manifest.json")
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path).expect("tool metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod tool");
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}
