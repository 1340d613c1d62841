//! Frame extraction: skip policy and the ffmpeg filter chain.
use super::Runner;
use crate::config::ExtractConfig;
use crate::error::PipelineError;
use crate::template::expand_placeholders;
use anyhow::Result;
use std::path::Path;

const EXTRACT_TEMPLATE: &str = "{ffmpeg} -y -i \"{video_path}\" -vf \"{filters}\" -qscale:v 2 \"{frames_dir}/frame_%05d.{format}\"";

pub(super) fn run(runner: &mut Runner<'_>) -> Result<()> {
    let extract = &runner.config.extract;

    // The skip check is presence-only: frames left over from different
    // extraction settings are reused as-is. --force re-extracts.
    if extract.skip_if_frames_exist
        && !runner.force
        && has_frames(&runner.layout.frames_dir, &extract.format)?
    {
        return runner.status("extract", "skipped (matching frames already present)");
    }

    let ctx = runner.ctx.with(&[
        ("filters", build_filter_chain(extract)),
        ("format", extract.format.clone()),
    ]);
    let command = expand_placeholders(EXTRACT_TEMPLATE, &ctx);
    runner.run_command("extract", &command)
}

/// True when the extraction directory already holds at least one file with
/// the configured output extension.
fn has_frames(frames_dir: &Path, format: &str) -> Result<bool> {
    let entries = std::fs::read_dir(frames_dir).map_err(|err| {
        PipelineError::Path(format!("read {}: {err}", frames_dir.display()))
    })?;
    for entry in entries {
        let entry =
            entry.map_err(|err| PipelineError::Path(format!("scan frames dir: {err}")))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == format) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Build the ffmpeg `-vf` chain: rate limit, optional long-edge-bounded
/// resize preserving aspect ratio, optional transpose.
fn build_filter_chain(extract: &ExtractConfig) -> String {
    let mut filters = vec![format!("fps={}", extract.fps)];
    if let Some(edge) = extract.max_long_edge {
        filters.push(format!(
            "scale=w={edge}:h={edge}:force_original_aspect_ratio=decrease:force_divisible_by=2"
        ));
    }
    if let Some(transpose) = extract.transpose {
        filters.push(format!("transpose={transpose}"));
    }
    filters.join(",")
}
