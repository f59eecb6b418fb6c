use cutline_timeline_model::ClipId;

use crate::plan::RenderStage;

/// Planning and export failures.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Could not fetch source for clip {clip} ({source_ref}): {reason}")]
    SourceFetch {
        clip: ClipId,
        source_ref: String,
        reason: String,
    },

    #[error("Timeline has no clips on the video track")]
    NoVideoClips,

    #[error("{stage} stage failed: {reason}")]
    Stage { stage: RenderStage, reason: String },

    #[error("Export cancelled during {stage} stage")]
    Cancelled { stage: RenderStage },

    #[error("Transcoder unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RenderError {
    pub fn stage(stage: RenderStage, reason: impl Into<String>) -> Self {
        Self::Stage {
            stage,
            reason: reason.into(),
        }
    }
}

impl From<RenderError> for cutline_common::CutlineError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Io(io) => cutline_common::CutlineError::Io(io),
            other => cutline_common::CutlineError::render(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutline_common::CutlineError;

    #[test]
    fn test_stage_errors_name_the_stage() {
        let err = RenderError::stage(RenderStage::MixAudio, "exit status 1");
        assert_eq!(err.to_string(), "mix_audio stage failed: exit status 1");

        let wrapped: CutlineError = err.into();
        assert!(matches!(wrapped, CutlineError::Render { .. }));
    }

    #[test]
    fn test_io_stays_io() {
        let err = RenderError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert!(matches!(CutlineError::from(err), CutlineError::Io(_)));
    }
}
