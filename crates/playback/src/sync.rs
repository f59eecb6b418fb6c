//! Which clips are live at a given time, and how they should sound.

use cutline_common::clock::DriftMeasurement;
use cutline_timeline_model::{Clip, ClipId, ClipKind, Track, TrackId, TrackRole, TIME_EPSILON};

/// Global mixer state applied on top of per-clip gain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixSettings {
    pub volume: f64,
    pub muted: bool,
}

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            volume: 1.0,
            muted: false,
        }
    }
}

impl MixSettings {
    pub fn with_volume(volume: f64) -> Self {
        Self {
            volume,
            muted: false,
        }
    }
}

/// Where an active clip's playhead sits relative to its trimmed region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipPhase {
    /// Inside the leading trim: frozen on the first playable frame, silent.
    Holding,
    /// Inside the playable region.
    Playing,
    /// Inside the trailing trim: paused on the last playable frame, silent.
    Finished,
}

/// Directive state for one clip under the playhead.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveClip {
    pub clip_id: ClipId,
    pub track_id: TrackId,
    pub kind: ClipKind,
    pub source_ref: String,
    pub phase: ClipPhase,

    /// Position the media element should be at, in source seconds.
    pub local_time: f64,

    /// Gain to apply, already combined with the global mix.
    pub volume: f64,
}

impl ActiveClip {
    /// Whether the media element should be running.
    pub fn should_play(&self) -> bool {
        self.phase == ClipPhase::Playing
    }
}

/// Everything the preview needs to render one instant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackView {
    pub time: f64,
    pub visual: Option<ActiveClip>,
    pub audio: Vec<ActiveClip>,
}

impl PlaybackView {
    pub fn active(&self) -> impl Iterator<Item = &ActiveClip> {
        self.visual.iter().chain(self.audio.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.visual.is_none() && self.audio.is_empty()
    }
}

/// `clip.volume` scaled by the global mix; zero when either is muted.
pub fn effective_volume(clip: &Clip, mix: &MixSettings) -> f64 {
    let global = if mix.muted || clip.muted {
        0.0
    } else {
        mix.volume
    };
    (clip.volume * global).clamp(0.0, 1.0)
}

/// State of `clip` at global time `t`, or `None` when `t` is outside it.
pub fn clip_state_at(clip: &Clip, t: f64, mix: &MixSettings) -> Option<ActiveClip> {
    if !clip.contains_time(t) {
        return None;
    }

    let relative = t - clip.start;
    let playable_end = clip.duration - clip.trim_end;
    let (phase, local_time) = if relative < clip.trim_start - TIME_EPSILON {
        (ClipPhase::Holding, clip.trim_start)
    } else if relative >= playable_end - TIME_EPSILON {
        (ClipPhase::Finished, playable_end)
    } else {
        (ClipPhase::Playing, relative)
    };

    let volume = match phase {
        ClipPhase::Playing => effective_volume(clip, mix),
        ClipPhase::Holding | ClipPhase::Finished => 0.0,
    };

    Some(ActiveClip {
        clip_id: clip.id.clone(),
        track_id: clip.track_id.clone(),
        kind: clip.kind,
        source_ref: clip.source_ref.clone(),
        phase,
        local_time,
        volume,
    })
}

/// Resolve the preview state at global time `t`.
///
/// At most one visual clip is reported: the first active one on the video
/// lane in `(start, id)` order. Every active clip on an audio lane is
/// reported for mixing.
pub fn resolve_at(clips: &[Clip], tracks: &[Track], t: f64, mix: &MixSettings) -> PlaybackView {
    let role_of = |track_id: &TrackId| {
        tracks
            .iter()
            .find(|track| &track.id == track_id)
            .map(|track| track.role)
    };

    let mut live: Vec<&Clip> = clips.iter().filter(|c| c.contains_time(t)).collect();
    live.sort_by(|a, b| a.start.total_cmp(&b.start).then_with(|| a.id.cmp(&b.id)));

    let mut view = PlaybackView {
        time: t,
        ..PlaybackView::default()
    };
    for clip in live {
        match role_of(&clip.track_id) {
            Some(TrackRole::Video) if clip.kind.is_visual() => {
                if view.visual.is_none() {
                    view.visual = clip_state_at(clip, t, mix);
                }
            }
            Some(role) if role.is_audio() => {
                view.audio.extend(clip_state_at(clip, t, mix));
            }
            _ => {
                tracing::trace!(clip = %clip.id, track = %clip.track_id, "Clip on unknown lane ignored");
            }
        }
    }
    view
}

/// Whether an external player has drifted far enough to warrant a seek.
pub fn needs_resync(reported_secs: f64, expected_secs: f64, tolerance_secs: f64) -> bool {
    DriftMeasurement::new(expected_secs, reported_secs).exceeds_threshold_secs(tolerance_secs)
}
