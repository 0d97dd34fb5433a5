use thiserror::Error;

/// Errors raised while turning a single frame into its encoded form.
#[derive(Debug, Error)]
pub enum FrameError {
    /// A frame (or a requested output size) has a zero width or height.
    #[error("invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// The source could not materialize frame `index` from its buffer.
    #[error("could not decode frame {index}: {reason}")]
    DecodeFailure { index: usize, reason: String },

    /// Luminance and color grids disagree in size. Indicates a pipeline bug.
    #[error("luminance grid is {}x{} but color grid is {}x{}", .luminance.0, .luminance.1, .colors.0, .colors.1)]
    DimensionMismatch { luminance: (u32, u32), colors: (u32, u32) },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Whether the driver may drop the offending frame and carry on with the next one.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FrameError::InvalidDimensions { .. } | FrameError::DecodeFailure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_frame_failures_are_recoverable() {
        assert!(FrameError::InvalidDimensions { width: 0, height: 4 }.is_recoverable());
        assert!(FrameError::DecodeFailure { index: 3, reason: "short read".into() }.is_recoverable());
    }

    #[test]
    fn pipeline_and_io_failures_are_fatal() {
        let mismatch = FrameError::DimensionMismatch { luminance: (2, 2), colors: (3, 2) };
        assert!(!mismatch.is_recoverable());
        assert_eq!(mismatch.to_string(), "luminance grid is 2x2 but color grid is 3x2");

        let io = FrameError::from(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
        assert!(!io.is_recoverable());
    }
}
