//! Track lanes and the media kinds they accept.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clip::ClipKind;

/// Identifier of a track lane.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// What a lane is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackRole {
    /// The single picture lane.
    Video,
    /// Music and effects lanes.
    Audio,
    /// Dedicated narration lane.
    VoiceOver,
}

impl TrackRole {
    /// Roles whose clips are summed by the audio mixer.
    pub fn is_audio(self) -> bool {
        matches!(self, TrackRole::Audio | TrackRole::VoiceOver)
    }
}

/// A named lane on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,

    /// Display name.
    pub name: String,

    pub role: TrackRole,

    /// Media kinds this lane accepts.
    pub accepts: Vec<ClipKind>,
}

impl Track {
    pub fn video(id: impl Into<TrackId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: TrackRole::Video,
            accepts: vec![ClipKind::Video, ClipKind::Image],
        }
    }

    pub fn audio(id: impl Into<TrackId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: TrackRole::Audio,
            accepts: vec![ClipKind::Audio],
        }
    }

    pub fn voice_over(id: impl Into<TrackId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: TrackRole::VoiceOver,
            accepts: vec![ClipKind::Audio],
        }
    }

    pub fn accepts(&self, kind: ClipKind) -> bool {
        self.accepts.contains(&kind)
    }
}

/// The standard project layout: one video lane, two audio lanes, and a
/// voice-over lane, top to bottom.
pub fn default_tracks() -> Vec<Track> {
    vec![
        Track::video("track1", "Video"),
        Track::audio("track2", "Audio 1"),
        Track::audio("track3", "Audio 2"),
        Track::voice_over("voiceover", "Voice-over"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_has_single_video_lane() {
        let tracks = default_tracks();
        let video_lanes = tracks
            .iter()
            .filter(|t| t.role == TrackRole::Video)
            .count();
        assert_eq!(video_lanes, 1);
        assert!(tracks.iter().any(|t| t.role == TrackRole::VoiceOver));
    }

    #[test]
    fn test_kind_acceptance() {
        let video = Track::video("track1", "Video");
        assert!(video.accepts(ClipKind::Video));
        assert!(video.accepts(ClipKind::Image));
        assert!(!video.accepts(ClipKind::Audio));

        let vo = Track::voice_over("voiceover", "VO");
        assert!(vo.accepts(ClipKind::Audio));
        assert!(!vo.accepts(ClipKind::Video));
        assert!(vo.role.is_audio());
    }
}
