use cutline_timeline_model::ClipId;

/// Errors raised while driving preview media.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("Media for clip {clip} is unavailable ({source_ref}): {reason}")]
    ResourceUnavailable {
        clip: ClipId,
        source_ref: String,
        reason: String,
    },

    #[error("Media backend error: {0}")]
    Backend(String),
}

impl From<PlaybackError> for cutline_common::CutlineError {
    fn from(err: PlaybackError) -> Self {
        cutline_common::CutlineError::playback(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_converts_to_playback_error() {
        let err = PlaybackError::ResourceUnavailable {
            clip: ClipId::new("clip-1"),
            source_ref: "intro.mp4".into(),
            reason: "decoder busy".into(),
        };
        let wrapped: cutline_common::CutlineError = err.into();
        assert!(wrapped.to_string().contains("intro.mp4"));
    }
}
