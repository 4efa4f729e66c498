pub type LyricResult<T> = Result<T, LyricError>;

#[derive(thiserror::Error, Debug)]
pub enum LyricError {
    /// Some lines (sentinel included) still lack a start time.
    #[error("incomplete timing: {} line(s) without a timestamp (first at index {})", .missing.len(), .missing.first().copied().unwrap_or_default())]
    IncompleteTiming { missing: Vec<usize> },

    #[error("malformed time code: {0}")]
    MalformedTimeCode(String),

    #[error("invalid media: {0}")]
    InvalidMedia(String),

    /// Not a failure: the caller asked the export to stop.
    #[error("export cancelled after {frames_captured} frame(s)")]
    ExportCancelled { frames_captured: u64 },

    #[error("encoder initialization error: {0}")]
    EncoderInitialization(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LyricError {
    pub fn malformed_time_code(msg: impl Into<String>) -> Self {
        Self::MalformedTimeCode(msg.into())
    }

    pub fn invalid_media(msg: impl Into<String>) -> Self {
        Self::InvalidMedia(msg.into())
    }

    pub fn encoder_init(msg: impl Into<String>) -> Self {
        Self::EncoderInitialization(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::ExportCancelled { .. })
    }

    /// Short user-facing hint for the error class, if one applies.
    ///
    /// Cancellation deliberately has none: callers clean up silently.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            Self::IncompleteTiming { .. } => {
                Some("set a timestamp for every lyric line and the trailing END marker")
            }
            Self::InvalidMedia(_) => {
                Some("make sure the audio file is fully loaded and reports a valid duration")
            }
            Self::EncoderInitialization(_) => Some(
                "the encoder could not be loaded; check that ffmpeg is installed and reachable \
                 (or set LYRICFRAME_FFMPEG) and try again",
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            LyricError::malformed_time_code("x")
                .to_string()
                .contains("malformed time code:")
        );
        assert!(
            LyricError::invalid_media("x")
                .to_string()
                .contains("invalid media:")
        );
        assert!(
            LyricError::encoder_init("x")
                .to_string()
                .contains("encoder initialization error:")
        );
        assert!(
            LyricError::encoding("x")
                .to_string()
                .contains("encoding error:")
        );
        assert!(
            LyricError::validation("x")
                .to_string()
                .contains("validation error:")
        );
    }

    #[test]
    fn incomplete_timing_names_first_missing_line() {
        let err = LyricError::IncompleteTiming {
            missing: vec![3, 7],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 line(s)"));
        assert!(msg.contains("index 3"));
    }

    #[test]
    fn cancellation_is_distinguished_and_silent() {
        let err = LyricError::ExportCancelled {
            frames_captured: 100,
        };
        assert!(err.is_cancelled());
        assert!(err.remediation().is_none());
        assert!(!LyricError::encoding("boom").is_cancelled());
    }

    #[test]
    fn init_errors_get_targeted_remediation() {
        let hint = LyricError::encoder_init("not found").remediation().unwrap();
        assert!(hint.contains("ffmpeg"));
        assert!(LyricError::encoding("x").remediation().is_none());
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = LyricError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
