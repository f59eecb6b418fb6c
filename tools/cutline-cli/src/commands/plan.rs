//! Print the render plan for a project.

use std::path::PathBuf;

use cutline_common::config::AppConfig;
use cutline_render_engine::{ProjectSources, RenderPlanBuilder};

use super::{export_options, load_project};
use crate::ExportArgs;

pub fn run(
    config: &AppConfig,
    path: PathBuf,
    args: &ExportArgs,
    json: bool,
) -> anyhow::Result<()> {
    let project = load_project(&path)?;
    let options = export_options(config, project.project.export.as_ref(), args)?;
    let timeline = &project.project.timeline;
    tracing::debug!(ffmpeg = %config.export.ffmpeg_binary, "Building plan");

    let plan = RenderPlanBuilder::for_project(&project, options, None).build(
        timeline.clips(),
        timeline.tracks(),
        &ProjectSources::new(&project),
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("Render plan ({} {} {})", options.format, options.quality, options.size);
    println!("  Output: {}", plan.output_path.display());
    println!();
    println!("  Video segments ({}):", plan.concat.len());
    for entry in &plan.concat {
        println!(
            "    {} at {:.2}s: {}",
            entry.clip_id,
            entry.timeline_start,
            entry.path.display()
        );
    }
    if !plan.audio_mix.is_empty() {
        println!("  Audio mix ({}):", plan.audio_mix.len());
        for entry in &plan.audio_mix {
            println!(
                "    {} delay {:.2}s, {:.2}s, volume {:.2}",
                entry.clip_id, entry.delay, entry.effective_duration, entry.volume
            );
        }
    }
    for gap in &plan.gaps {
        println!("  Gap: {:.2}s → {:.2}s (not rendered)", gap.start, gap.end);
    }
    for clip in &plan.skipped {
        println!("  Skipped: {clip} (source unavailable)");
    }
    println!();
    for op in &plan.operations {
        println!("  [{}] {} {}", op.stage, config.export.ffmpeg_binary, op.args.join(" "));
    }

    Ok(())
}
