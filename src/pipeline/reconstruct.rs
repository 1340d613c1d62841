//! COLMAP reconstruction: automatic and manual command sequences.
//!
//! Both modes converge on the same output contract, an undistorted-image
//! directory and a sparse model usable by the training stage, so the rest
//! of the pipeline never branches on the mode again.
use super::Runner;
use crate::config::{ReconstructConfig, ReconstructMode};
use crate::template::expand_placeholders;
use anyhow::Result;

const AUTOMATIC_TEMPLATE: &str = "{colmap} automatic_reconstructor --workspace_path \"{colmap_dir}\" --image_path \"{frames_dir}\" --single_camera {single_camera} --num_threads {num_threads} --dense {dense}";
const FEATURES_TEMPLATE: &str = "{colmap} feature_extractor --database_path \"{database_path}\" --image_path \"{frames_dir}\" --ImageReader.single_camera {single_camera} --SiftExtraction.num_threads {num_threads}";
const MATCHER_TEMPLATE: &str = "{colmap} exhaustive_matcher --database_path \"{database_path}\" --SiftMatching.num_threads {num_threads}";
const MAPPER_TEMPLATE: &str = "{colmap} mapper --database_path \"{database_path}\" --image_path \"{frames_dir}\" --output_path \"{sparse_dir}\" --Mapper.num_threads {num_threads}";
const UNDISTORT_TEMPLATE: &str = "{colmap} image_undistorter --image_path \"{frames_dir}\" --input_path \"{sparse_dir}/0\" --output_path \"{undistorted_dir}\" --output_type COLMAP";

pub(super) fn run(runner: &mut Runner<'_>) -> Result<()> {
    let reconstruct = &runner.config.reconstruct;
    let ctx = runner.ctx.with(&[
        ("single_camera", colmap_bool(reconstruct.single_camera)),
        ("num_threads", reconstruct.num_threads.to_string()),
        ("dense", colmap_bool(reconstruct.dense)),
    ]);

    for (stage, template) in steps(reconstruct) {
        let command = expand_placeholders(template, &ctx);
        runner.run_command(stage, &command)?;
    }
    Ok(())
}

/// The sub-step sequence for the configured mode, with user overrides
/// applied per step.
fn steps(reconstruct: &ReconstructConfig) -> Vec<(&'static str, &str)> {
    let template = |key: &str, default: &'static str| -> &str {
        reconstruct
            .command_overrides
            .get(key)
            .map_or(default, String::as_str)
    };
    match reconstruct.mode {
        ReconstructMode::Automatic => vec![
            ("reconstruct", template("automatic", AUTOMATIC_TEMPLATE)),
            ("undistort", template("undistort", UNDISTORT_TEMPLATE)),
        ],
        ReconstructMode::Manual => vec![
            ("features", template("feature_extractor", FEATURES_TEMPLATE)),
            ("matching", template("matcher", MATCHER_TEMPLATE)),
            ("mapping", template("mapper", MAPPER_TEMPLATE)),
            ("undistort", template("undistort", UNDISTORT_TEMPLATE)),
        ],
    }
}

/// COLMAP boolean options take 0/1, not flags.
fn colmap_bool(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn config(mode: ReconstructMode) -> ReconstructConfig {
        ReconstructConfig {
            mode,
            database_name: "database.db".to_string(),
            single_camera: true,
            num_threads: -1,
            dense: false,
            command_overrides: BTreeMap::new(),
        }
    }

    #[test]
    fn automatic_mode_has_two_steps() {
        let config = config(ReconstructMode::Automatic);
        let steps = steps(&config);
        let names: Vec<&str> = steps.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["reconstruct", "undistort"]);
    }

    #[test]
    fn manual_mode_has_four_steps_in_order() {
        let config = config(ReconstructMode::Manual);
        let steps = steps(&config);
        let names: Vec<&str> = steps.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["features", "matching", "mapping", "undistort"]);
    }

    #[test]
    fn overrides_replace_individual_steps_only() {
        let mut config = config(ReconstructMode::Manual);
        config
            .command_overrides
            .insert("matcher".to_string(), "{colmap} sequential_matcher".to_string());

        let steps = steps(&config);
        assert_eq!(steps[1].1, "{colmap} sequential_matcher");
        assert_eq!(steps[0].1, FEATURES_TEMPLATE);
    }
}
