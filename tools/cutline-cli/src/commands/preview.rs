//! Show what the preview would render at a given instant.

use std::path::PathBuf;

use cutline_common::config::AppConfig;
use cutline_playback::{resolve_at, ActiveClip, ClipPhase, MixSettings};

use super::load_project;

pub fn run(
    config: &AppConfig,
    path: PathBuf,
    at: f64,
    volume: Option<f64>,
    muted: bool,
) -> anyhow::Result<()> {
    let project = load_project(&path)?;
    let timeline = &project.project.timeline;

    let mix = MixSettings {
        volume: volume.unwrap_or(config.playback.default_volume),
        muted,
    };
    let view = resolve_at(timeline.clips(), timeline.tracks(), at, &mix);

    println!("At {:.2}s of {:.2}s", view.time, timeline.duration());
    match &view.visual {
        Some(active) => print_active("Visual", active),
        None => println!("  Visual: (blank)"),
    }
    if view.audio.is_empty() {
        println!("  Audio:  (silence)");
    }
    for active in &view.audio {
        print_active("Audio ", active);
    }

    Ok(())
}

fn print_active(label: &str, active: &ActiveClip) {
    let phase = match active.phase {
        ClipPhase::Holding => "holding",
        ClipPhase::Playing => "playing",
        ClipPhase::Finished => "finished",
    };
    println!(
        "  {label}: {} on {} ({}) {phase} at {:.2}s, volume {:.2}",
        active.clip_id, active.track_id, active.source_ref, active.local_time, active.volume
    );
}
