//! Export a project to video.

use std::io::Write;
use std::path::PathBuf;

use cutline_common::config::AppConfig;
use cutline_render_engine::{
    cancellation, run_export, ExportEvent, FfmpegBackend, ProjectSources, RenderPlanBuilder,
    TranscoderBackend,
};

use super::{export_options, load_project};
use crate::ExportArgs;

pub async fn run(
    config: &AppConfig,
    path: PathBuf,
    output: Option<PathBuf>,
    args: &ExportArgs,
) -> anyhow::Result<()> {
    println!("Exporting project at: {}", path.display());

    let project = load_project(&path)?;
    let options = export_options(config, project.project.export.as_ref(), args)?;
    let timeline = &project.project.timeline;

    let backend = FfmpegBackend::new(config.export.ffmpeg_binary.clone());
    if !backend.is_available() {
        anyhow::bail!(
            "{} not found on PATH; install it or set export.ffmpeg_binary",
            config.export.ffmpeg_binary
        );
    }

    let plan = RenderPlanBuilder::for_project(&project, options, output).build(
        timeline.clips(),
        timeline.tracks(),
        &ProjectSources::new(&project),
    )?;

    println!("  Output: {}", plan.output_path.display());
    println!("  Format: {} ({}, {})", options.format, options.quality, options.size);
    if !plan.skipped.is_empty() {
        println!("  Skipping {} clip(s) with missing sources", plan.skipped.len());
    }

    let (canceller, token) = cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    let observer = |event: ExportEvent| match event {
        ExportEvent::Progress { stage, percent } => {
            print!("\r  {:<12} {percent:5.1}%  ", stage.as_str());
            let _ = std::io::stdout().flush();
        }
        ExportEvent::Completed { artifact } => {
            println!("\nExport complete: {}", artifact.display());
        }
        ExportEvent::Failed { stage, reason } => {
            println!("\nExport failed during {stage}: {reason}");
        }
        ExportEvent::Cancelled { stage } => {
            println!("\nExport cancelled during {stage}");
        }
    };

    run_export(&plan, &backend, &observer, token).await?;
    Ok(())
}
