//! The timeline store: fixed tracks holding non-overlapping clips.
//!
//! `Timeline` is the only place clip state is mutated. Every mutation is
//! validated as a whole before it is applied, so a failed call leaves the
//! store untouched. Readers that need a stable view take a
//! [`TimelineSnapshot`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clip::{Clip, ClipId, ClipKind, ClipPatch, TIME_EPSILON};
use crate::track::{default_tracks, Track, TrackId, TrackRole};

/// Clip placement and mutation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimelineError {
    #[error("Clip {clip} would overlap clip {conflicting} on track {track}")]
    Overlap {
        clip: ClipId,
        track: TrackId,
        conflicting: ClipId,
    },

    #[error(
        "Trim leaves no playable media on clip {clip} (duration {duration:.3}s, trim {trim_start:.3}s + {trim_end:.3}s)"
    )]
    InvalidTrim {
        clip: ClipId,
        duration: f64,
        trim_start: f64,
        trim_end: f64,
    },

    #[error("Track {track} does not accept {kind} clips")]
    TrackKindMismatch { track: TrackId, kind: ClipKind },

    #[error("Clip may only be placed on track {allowed}, not {track}")]
    TrackNotAllowed { track: TrackId, allowed: TrackId },

    #[error("Unknown track: {track}")]
    UnknownTrack { track: TrackId },

    #[error("Unknown clip: {clip}")]
    UnknownClip { clip: ClipId },

    #[error("Clip id already in use: {clip}")]
    DuplicateClip { clip: ClipId },

    #[error("Invalid placement for clip {clip}: {message}")]
    InvalidPlacement { clip: ClipId, message: String },
}

/// Immutable deep copy of the clip set at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSnapshot {
    clips: Arc<[Clip]>,
}

impl TimelineSnapshot {
    pub fn new(clips: Vec<Clip>) -> Self {
        Self {
            clips: clips.into(),
        }
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

/// Tracks plus the clips placed on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Schema version.
    pub version: String,

    /// Lanes, top to bottom. Fixed for the lifetime of a project.
    tracks: Vec<Track>,

    /// Clips in insertion order.
    #[serde(default)]
    clips: Vec<Clip>,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Timeline {
    /// Empty timeline with the default track layout.
    pub fn new() -> Self {
        Self::with_tracks(default_tracks())
    }

    pub fn with_tracks(tracks: Vec<Track>) -> Self {
        Self {
            version: "1.0".to_string(),
            tracks,
            clips: vec![],
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn track(&self, id: &TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| &t.id == id)
    }

    /// Vertical position of a track (0 = top).
    pub fn track_index(&self, id: &TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| &t.id == id)
    }

    /// The picture lane, if the layout has one.
    pub fn video_track(&self) -> Option<&Track> {
        self.tracks.iter().find(|t| t.role == TrackRole::Video)
    }

    pub fn clip(&self, id: &ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| &c.id == id)
    }

    /// Clips on one track ordered by `(start, id)`.
    pub fn clips_on_track(&self, track: &TrackId) -> Vec<&Clip> {
        let mut clips: Vec<&Clip> = self.clips.iter().filter(|c| &c.track_id == track).collect();
        clips.sort_by(|a, b| a.start.total_cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        clips
    }

    /// First clip (in `(start, id)` order) on `track` whose interval
    /// intersects `[start, start+duration)`, ignoring `ignore`.
    pub fn first_conflict(
        &self,
        track: &TrackId,
        start: f64,
        duration: f64,
        ignore: Option<&ClipId>,
    ) -> Option<&Clip> {
        self.clips_on_track(track)
            .into_iter()
            .filter(|c| Some(&c.id) != ignore)
            .find(|c| c.overlaps_interval(start, duration))
    }

    /// Whether the interval is free on `track`.
    pub fn is_free(
        &self,
        track: &TrackId,
        start: f64,
        duration: f64,
        ignore: Option<&ClipId>,
    ) -> bool {
        self.first_conflict(track, start, duration, ignore).is_none()
    }

    /// End of the last clip.
    pub fn duration(&self) -> f64 {
        self.clips.iter().map(Clip::end).fold(0.0, f64::max)
    }

    /// Generate an id of the form `{prefix}-{n}` not used by any clip.
    pub fn next_clip_id(&self, prefix: &str) -> ClipId {
        let mut n = self.clips.len() + 1;
        loop {
            let candidate = ClipId(format!("{prefix}-{n}"));
            if self.clip(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Insert a clip. The placement must already be conflict-free.
    pub fn add_clip(&mut self, clip: Clip) -> Result<&Clip, TimelineError> {
        if self.clip(&clip.id).is_some() {
            return Err(TimelineError::DuplicateClip { clip: clip.id });
        }

        let clip = self.validate_candidate(clip, None)?;
        tracing::debug!(
            clip = %clip.id,
            track = %clip.track_id,
            start = clip.start,
            duration = clip.duration,
            "Clip added"
        );
        self.clips.push(clip);
        Ok(&self.clips[self.clips.len() - 1])
    }

    pub fn remove_clip(&mut self, id: &ClipId) -> Result<Clip, TimelineError> {
        let index = self
            .clips
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| TimelineError::UnknownClip { clip: id.clone() })?;
        let removed = self.clips.remove(index);
        tracing::debug!(clip = %removed.id, track = %removed.track_id, "Clip removed");
        Ok(removed)
    }

    /// Apply a patch atomically: either the whole patch applies or nothing
    /// changes.
    pub fn update_clip(&mut self, id: &ClipId, patch: &ClipPatch) -> Result<&Clip, TimelineError> {
        let index = self
            .clips
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| TimelineError::UnknownClip { clip: id.clone() })?;

        let candidate = self.clips[index].patched(patch);
        let candidate = self.validate_candidate(candidate, Some(id))?;
        self.clips[index] = candidate;
        Ok(&self.clips[index])
    }

    /// Check a full clip against every placement rule.
    ///
    /// Returns the clip with its volume clamped to `[0, 1]`.
    pub fn validate_candidate(
        &self,
        mut clip: Clip,
        ignore: Option<&ClipId>,
    ) -> Result<Clip, TimelineError> {
        if !clip.start.is_finite() || clip.start < -TIME_EPSILON {
            return Err(TimelineError::InvalidPlacement {
                clip: clip.id,
                message: format!("start must be a non-negative number, got {}", clip.start),
            });
        }
        if !clip.duration.is_finite() || clip.duration <= TIME_EPSILON {
            return Err(TimelineError::InvalidPlacement {
                clip: clip.id,
                message: format!("duration must be positive, got {}", clip.duration),
            });
        }
        clip.start = clip.start.max(0.0);

        let track = self
            .track(&clip.track_id)
            .ok_or_else(|| TimelineError::UnknownTrack {
                track: clip.track_id.clone(),
            })?;
        if !track.accepts(clip.kind) {
            return Err(TimelineError::TrackKindMismatch {
                track: track.id.clone(),
                kind: clip.kind,
            });
        }

        if !clip.has_valid_trim() {
            return Err(TimelineError::InvalidTrim {
                clip: clip.id,
                duration: clip.duration,
                trim_start: clip.trim_start,
                trim_end: clip.trim_end,
            });
        }

        if let Some(conflict) =
            self.first_conflict(&clip.track_id, clip.start, clip.duration, ignore.or(Some(&clip.id)))
        {
            return Err(TimelineError::Overlap {
                clip: clip.id.clone(),
                track: clip.track_id.clone(),
                conflicting: conflict.id.clone(),
            });
        }

        clip.volume = if clip.volume.is_finite() {
            clip.volume.clamp(0.0, 1.0)
        } else {
            1.0
        };
        Ok(clip)
    }

    /// Scan the whole store for invariant violations (e.g. after loading a
    /// hand-edited project file).
    pub fn validate(&self) -> Vec<TimelineError> {
        let mut errors = vec![];
        for (i, clip) in self.clips.iter().enumerate() {
            if self.clips[..i].iter().any(|c| c.id == clip.id) {
                errors.push(TimelineError::DuplicateClip {
                    clip: clip.id.clone(),
                });
                continue;
            }

            let others = Timeline {
                version: self.version.clone(),
                tracks: self.tracks.clone(),
                clips: self.clips[..i].to_vec(),
            };
            if let Err(e) = others.validate_candidate(clip.clone(), None) {
                errors.push(e);
            }
        }
        errors
    }

    pub fn snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot::new(self.clips.clone())
    }

    /// Replace the clip set wholesale with a snapshot.
    pub fn restore(&mut self, snapshot: &TimelineSnapshot) {
        self.clips = snapshot.clips().to_vec();
    }
}
