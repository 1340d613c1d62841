//! End-to-end pipeline scenarios driven through the real binary with fake
//! external tools.

mod common;

use common::Fixture;

const EXIT_CONFIG: i32 = 2;
const EXIT_TOOL_MISSING: i32 = 3;
const EXIT_STAGE_FAILED: i32 = 4;

#[cfg(unix)]
#[test]
fn automatic_mode_runs_three_commands_before_training() {
    let fx = Fixture::new();
    let config = fx.write_config(&fx.base_config("automatic"));

    let output = fx.run_cli(&["run", "--config", config.to_str().expect("utf-8")]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let calls = fx.calls();
    assert_eq!(calls.len(), 5, "calls: {calls:?}");
    assert!(calls[0].starts_with("ffmpeg "), "calls: {calls:?}");
    assert!(calls[1].starts_with("colmap automatic_reconstructor"));
    assert!(calls[2].starts_with("colmap image_undistorter"));
    assert!(calls[3].starts_with("trainer train.py"));
    assert!(calls[4].starts_with("trainer export.py"));

    let manifest: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(fx.manifest_path()).expect("manifest written"),
    )
    .expect("manifest parses");
    assert_eq!(manifest["backend"], "inria");
    assert!(
        manifest["output_file"]
            .as_str()
            .expect("output_file string")
            .ends_with("garden_gaussians.ply"),
        "manifest: {manifest}"
    );
}

#[cfg(unix)]
#[test]
fn manual_mode_runs_four_reconstruction_commands_in_order() {
    let fx = Fixture::new();
    let config = fx.write_config(&fx.base_config("manual"));

    let output = fx.run_cli(&["run", "--config", config.to_str().expect("utf-8")]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let calls = fx.calls();
    assert_eq!(calls.len(), 7, "calls: {calls:?}");
    assert!(calls[1].starts_with("colmap feature_extractor"));
    assert!(calls[2].starts_with("colmap exhaustive_matcher"));
    assert!(calls[3].starts_with("colmap mapper"));
    assert!(calls[4].starts_with("colmap image_undistorter"));
    assert!(calls[5].starts_with("trainer train.py"));
}

#[test]
fn missing_video_path_key_fails_before_any_work() {
    let fx = Fixture::new();
    let mut value = fx.base_config("automatic");
    value["project"]
        .as_object_mut()
        .expect("project object")
        .remove("video_path");
    let config = fx.write_config(&value);

    let output = fx.run_cli(&["run", "--config", config.to_str().expect("utf-8")]);
    assert_eq!(output.status.code(), Some(EXIT_CONFIG));
    assert!(
        stderr(&output).contains("project.video_path"),
        "stderr: {}",
        stderr(&output)
    );
    assert!(
        !fx.working_dir().exists(),
        "no directory may be created on config error"
    );
    assert!(fx.calls().is_empty(), "no subprocess may be spawned");
}

#[cfg(unix)]
#[test]
fn prepopulated_frames_skip_extraction() {
    let fx = Fixture::new();
    let config = fx.write_config(&fx.base_config("automatic"));
    let frames = fx.working_dir().join("frames");
    std::fs::create_dir_all(&frames).expect("pre-create frames dir");
    std::fs::write(frames.join("frame_00001.jpg"), b"stale").expect("seed frame");

    let output = fx.run_cli(&["run", "--config", config.to_str().expect("utf-8")]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let calls = fx.calls();
    assert!(
        calls[0].starts_with("colmap "),
        "extraction must be skipped, calls: {calls:?}"
    );
    assert!(fx.run_log().contains("skipped"), "skip must be logged");
}

#[cfg(unix)]
#[test]
fn force_overrides_skip_policy() {
    let fx = Fixture::new();
    let config = fx.write_config(&fx.base_config("automatic"));
    let frames = fx.working_dir().join("frames");
    std::fs::create_dir_all(&frames).expect("pre-create frames dir");
    std::fs::write(frames.join("frame_00001.jpg"), b"stale").expect("seed frame");

    let output = fx.run_cli(&[
        "run",
        "--config",
        config.to_str().expect("utf-8"),
        "--force",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(
        fx.calls()[0].starts_with("ffmpeg "),
        "force must re-run extraction"
    );
}

#[cfg(unix)]
#[test]
fn failing_stage_propagates_exit_code_and_writes_no_manifest() {
    let fx = Fixture::new();
    let mut value = fx.base_config("automatic");
    let failing = fx.fake_tool_with("trainer-broken", "echo simulated blowup\nexit 7");
    value["tools"]["inria"] = serde_json::json!(failing);
    let config = fx.write_config(&value);

    let output = fx.run_cli(&["run", "--config", config.to_str().expect("utf-8")]);
    assert_eq!(output.status.code(), Some(EXIT_STAGE_FAILED));
    assert!(
        stderr(&output).contains("status 7"),
        "stderr: {}",
        stderr(&output)
    );
    assert!(!fx.manifest_path().exists(), "no manifest on failure");

    let log = fx.run_log();
    assert!(log.contains("[train] $ "), "log holds the failing command");
    assert!(log.contains("simulated blowup"), "log holds captured output");
    assert!(log.contains("failed with status 7"), "log: {log}");
}

#[cfg(unix)]
#[test]
fn dry_run_spawns_nothing_but_logs_every_command() {
    let fx = Fixture::new();
    let config = fx.write_config(&fx.base_config("automatic"));

    let output = fx.run_cli(&[
        "run",
        "--config",
        config.to_str().expect("utf-8"),
        "--dry-run",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(fx.calls().is_empty(), "dry-run must spawn nothing");
    assert!(!fx.manifest_path().exists(), "dry-run writes no manifest");

    let log = fx.run_log();
    for stage in ["extract", "reconstruct", "undistort", "train", "export"] {
        assert!(
            log.contains(&format!("[{stage}] $ ")),
            "log must show the {stage} command: {log}"
        );
    }
}

#[cfg(unix)]
#[test]
fn unconfigured_backend_tool_fails_lazily() {
    let fx = Fixture::new();
    let mut value = fx.base_config("automatic");
    value["tools"]["inria"] = serde_json::Value::Null;
    let config = fx.write_config(&value);

    let output = fx.run_cli(&["run", "--config", config.to_str().expect("utf-8")]);
    assert_eq!(output.status.code(), Some(EXIT_TOOL_MISSING));

    // Earlier stages ran before the missing launcher was needed.
    let calls = fx.calls();
    assert_eq!(calls.len(), 3, "extract + reconstruct ran first: {calls:?}");
    assert!(calls[0].starts_with("ffmpeg "));
}

#[cfg(unix)]
#[test]
fn seed_resolves_into_the_train_command_at_dispatch_time() {
    let fx = Fixture::new();
    let mut value = fx.base_config("automatic");
    value["project"]["seed"] = serde_json::json!(1234);
    let config = fx.write_config(&value);

    let output = fx.run_cli(&["run", "--config", config.to_str().expect("utf-8")]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let train_call = fx
        .calls()
        .into_iter()
        .find(|line| line.contains("train.py"))
        .expect("train invocation recorded");
    assert!(train_call.contains("--seed 1234"), "got: {train_call}");
}

#[test]
fn init_config_writes_template_and_refuses_overwrite() {
    let fx = Fixture::new();
    let out = fx.root().join("pipeline.jsonc");

    let output = fx.run_cli(&["init-config", "--out", out.to_str().expect("utf-8")]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = std::fs::read_to_string(&out).expect("template written");
    assert!(text.contains("\"backend\""));

    let output = fx.run_cli(&["init-config", "--out", out.to_str().expect("utf-8")]);
    assert!(
        !output.status.success(),
        "second init-config must not overwrite"
    );
    assert_eq!(
        std::fs::read_to_string(&out).expect("template intact"),
        text,
        "existing template must be untouched"
    );
}

fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
