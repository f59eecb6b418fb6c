//! Place a clip on a project's timeline.

use std::path::PathBuf;

use cutline_common::config::AppConfig;
use cutline_editing_core::{Editor, RejectReason, Resolution};
use cutline_timeline_model::{Clip, ClipKind, TrackId, TrackRole};

use super::load_project;

pub struct AddRequest {
    pub path: PathBuf,
    pub kind: ClipKind,
    pub source: String,
    pub track: Option<String>,
    pub start: f64,
    pub duration: f64,
    pub trim_start: f64,
    pub trim_end: f64,
    pub volume: f64,
    pub strict: bool,
}

pub fn run(config: &AppConfig, request: AddRequest) -> anyhow::Result<()> {
    let mut project = load_project(&request.path)?;
    let timeline = std::mem::take(&mut project.project.timeline);

    let track_id = match request.track {
        Some(track) => TrackId::new(track),
        None => default_track(&timeline, request.kind)?,
    };
    let id = timeline.next_clip_id("clip");
    let clip = Clip::new(
        id.clone(),
        track_id,
        request.kind,
        request.source,
        request.start,
        request.duration,
    )
    .with_trim(request.trim_start, request.trim_end)
    .with_volume(request.volume);

    let mut editor = Editor::from_defaults(timeline, &config.editor);
    if request.strict {
        editor.add_clip(clip)?;
    } else {
        match editor.insert_clip(clip)? {
            Resolution::Placed(placement) if placement.relocated => {
                println!(
                    "Requested position was taken; placed at {:.2}s instead.",
                    placement.start
                );
            }
            Resolution::Placed(_) => {}
            Resolution::Rejected(reason) => {
                let why = match reason {
                    RejectReason::NoFreeSlot { blocker } => {
                        format!("no room next to clip {blocker}")
                    }
                    other => format!("{other:?}"),
                };
                anyhow::bail!("Clip could not be placed: {why}");
            }
        }
    }

    let added = editor
        .timeline()
        .clip(&id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Clip {id} missing after insert"))?;
    project.project.timeline = editor.into_timeline();
    project.project.touch();
    project
        .save()
        .map_err(|e| anyhow::anyhow!("Failed to save project: {e}"))?;

    println!(
        "Added {} clip {} on {} at {:.2}s → {:.2}s",
        added.kind,
        added.id,
        added.track_id,
        added.start,
        added.end()
    );
    if !project.source_path(&added.source_ref).exists() {
        println!("  Warning: source {} does not exist yet", added.source_ref);
    }

    Ok(())
}

fn default_track(
    timeline: &cutline_timeline_model::Timeline,
    kind: ClipKind,
) -> anyhow::Result<TrackId> {
    timeline
        .tracks()
        .iter()
        .find(|t| t.accepts(kind) && (kind.is_visual() || t.role == TrackRole::Audio))
        .map(|t| t.id.clone())
        .ok_or_else(|| anyhow::anyhow!("No track accepts {kind} clips"))
}
