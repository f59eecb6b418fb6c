//! Clip types: the unit placed on the timeline.
//!
//! Clips serialize to the camelCase record shape the UI and persistence
//! layers exchange: `{id, trackId, start, duration, kind, sourceRef,
//! volume?, muted?, trimStart?, trimEnd?}`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::track::TrackId;

/// Tolerance used for every time comparison on the timeline.
pub const TIME_EPSILON: f64 = 1e-9;

/// Opaque, immutable clip identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipId(pub String);

impl ClipId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClipId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Media kind of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipKind {
    Video,
    Audio,
    Image,
}

impl ClipKind {
    /// Whether the clip produces pictures (video lane content).
    pub fn is_visual(self) -> bool {
        matches!(self, ClipKind::Video | ClipKind::Image)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClipKind::Video => "video",
            ClipKind::Audio => "audio",
            ClipKind::Image => "image",
        }
    }
}

impl fmt::Display for ClipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A placed media segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: ClipId,

    pub track_id: TrackId,

    /// Timeline position in seconds.
    pub start: f64,

    /// Length on the timeline in seconds.
    pub duration: f64,

    pub kind: ClipKind,

    /// Handle to the media bytes; resolved by an external collaborator.
    pub source_ref: String,

    /// Clip gain [0.0, 1.0].
    #[serde(default = "default_volume")]
    pub volume: f64,

    #[serde(default)]
    pub muted: bool,

    /// Seconds of source skipped at the front.
    #[serde(default)]
    pub trim_start: f64,

    /// Seconds of source skipped at the back.
    #[serde(default)]
    pub trim_end: f64,
}

fn default_volume() -> f64 {
    1.0
}

impl Clip {
    /// Create an untrimmed, full-volume clip.
    pub fn new(
        id: impl Into<ClipId>,
        track_id: impl Into<TrackId>,
        kind: ClipKind,
        source_ref: impl Into<String>,
        start: f64,
        duration: f64,
    ) -> Self {
        Self {
            id: id.into(),
            track_id: track_id.into(),
            start,
            duration,
            kind,
            source_ref: source_ref.into(),
            volume: 1.0,
            muted: false,
            trim_start: 0.0,
            trim_end: 0.0,
        }
    }

    pub fn with_trim(mut self, trim_start: f64, trim_end: f64) -> Self {
        self.trim_start = trim_start;
        self.trim_end = trim_end;
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    /// End time on the timeline (exclusive).
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Playable length after trimming.
    pub fn effective_duration(&self) -> f64 {
        self.duration - self.trim_start - self.trim_end
    }

    /// Trim values are non-negative and leave something to play.
    pub fn has_valid_trim(&self) -> bool {
        self.trim_start >= 0.0
            && self.trim_end >= 0.0
            && self.trim_start.is_finite()
            && self.trim_end.is_finite()
            && self.effective_duration() > TIME_EPSILON
    }

    /// Whether `[start, start+duration)` intersects this clip's interval.
    /// Touching edges do not count.
    pub fn overlaps_interval(&self, start: f64, duration: f64) -> bool {
        intervals_overlap(self.start, self.end(), start, start + duration)
    }

    pub fn overlaps(&self, other: &Clip) -> bool {
        self.overlaps_interval(other.start, other.duration)
    }

    /// Whether global time `t` falls inside `[start, end)`.
    pub fn contains_time(&self, t: f64) -> bool {
        t >= self.start - TIME_EPSILON && t < self.end() - TIME_EPSILON
    }

    /// Return a copy with the patch applied. Validation is the caller's job.
    pub fn patched(&self, patch: &ClipPatch) -> Clip {
        let mut next = self.clone();
        if let Some(track_id) = &patch.track_id {
            next.track_id = track_id.clone();
        }
        if let Some(start) = patch.start {
            next.start = start;
        }
        if let Some(duration) = patch.duration {
            next.duration = duration;
        }
        if let Some(volume) = patch.volume {
            next.volume = volume;
        }
        if let Some(muted) = patch.muted {
            next.muted = muted;
        }
        if let Some(trim_start) = patch.trim_start {
            next.trim_start = trim_start;
        }
        if let Some(trim_end) = patch.trim_end {
            next.trim_end = trim_end;
        }
        if let Some(source_ref) = &patch.source_ref {
            next.source_ref = source_ref.clone();
        }
        next
    }
}

/// Half-open interval intersection with [`TIME_EPSILON`] slack.
pub fn intervals_overlap(a_start: f64, a_end: f64, b_start: f64, b_end: f64) -> bool {
    a_start < b_end - TIME_EPSILON && b_start < a_end - TIME_EPSILON
}

/// Partial update for [`Clip`]. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClipPatch {
    pub track_id: Option<TrackId>,
    pub start: Option<f64>,
    pub duration: Option<f64>,
    pub volume: Option<f64>,
    pub muted: Option<bool>,
    pub trim_start: Option<f64>,
    pub trim_end: Option<f64>,
    pub source_ref: Option<String>,
}

impl ClipPatch {
    /// Patch that moves a clip to a new placement.
    pub fn placement(track_id: TrackId, start: f64, duration: f64) -> Self {
        Self {
            track_id: Some(track_id),
            start: Some(start),
            duration: Some(duration),
            ..Self::default()
        }
    }

    pub fn trim(trim_start: f64, trim_end: f64) -> Self {
        Self {
            trim_start: Some(trim_start),
            trim_end: Some(trim_end),
            ..Self::default()
        }
    }

    /// Whether the patch touches track, start, or duration.
    pub fn changes_placement(&self) -> bool {
        self.track_id.is_some() || self.start.is_some() || self.duration.is_some()
    }

    pub fn changes_trim(&self) -> bool {
        self.trim_start.is_some() || self.trim_end.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(start: f64, duration: f64) -> Clip {
        Clip::new("c1", "track1", ClipKind::Video, "a.mp4", start, duration)
    }

    #[test]
    fn test_effective_duration() {
        let c = clip(0.0, 10.0).with_trim(2.0, 1.0);
        assert!((c.effective_duration() - 7.0).abs() < 1e-9);
        assert!(c.has_valid_trim());

        let exhausted = clip(0.0, 3.0).with_trim(2.0, 1.0);
        assert!(!exhausted.has_valid_trim());

        let negative = clip(0.0, 3.0).with_trim(-1.0, 0.0);
        assert!(!negative.has_valid_trim());
    }

    #[test]
    fn test_touching_intervals_do_not_overlap() {
        let a = clip(0.0, 5.0);
        assert!(!a.overlaps_interval(5.0, 2.0));
        assert!(a.overlaps_interval(4.999, 2.0));
        assert!(!a.overlaps_interval(-2.0, 2.0));
    }

    #[test]
    fn test_contains_time_is_half_open() {
        let a = clip(1.0, 2.0);
        assert!(a.contains_time(1.0));
        assert!(a.contains_time(2.9));
        assert!(!a.contains_time(3.0));
        assert!(!a.contains_time(0.5));
    }

    #[test]
    fn test_record_defaults_optional_fields() {
        let raw = r#"{
            "id": "v1",
            "trackId": "track1",
            "start": 0,
            "duration": 5,
            "kind": "video",
            "sourceRef": "media/intro.mp4"
        }"#;
        let parsed: Clip = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.volume, 1.0);
        assert!(!parsed.muted);
        assert_eq!(parsed.trim_start, 0.0);
        assert_eq!(parsed.trim_end, 0.0);
        assert_eq!(parsed.track_id, TrackId::from("track1"));
    }

    #[test]
    fn test_record_uses_camel_case() {
        let json = serde_json::to_string(&clip(0.0, 1.0).with_trim(0.5, 0.0)).unwrap();
        assert!(json.contains("\"trackId\":\"track1\""));
        assert!(json.contains("\"sourceRef\":\"a.mp4\""));
        assert!(json.contains("\"trimStart\":0.5"));
        assert!(json.contains("\"kind\":\"video\""));
    }

    #[test]
    fn test_patch_applies_only_set_fields() {
        let c = clip(0.0, 5.0).with_volume(0.7);
        let patched = c.patched(&ClipPatch {
            start: Some(3.0),
            muted: Some(true),
            ..ClipPatch::default()
        });
        assert_eq!(patched.start, 3.0);
        assert!(patched.muted);
        assert_eq!(patched.duration, 5.0);
        assert_eq!(patched.volume, 0.7);
    }
}
