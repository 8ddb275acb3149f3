//! Error types for matrix profile computation and analysis.

use thiserror::Error;

/// Result type alias for matrix profile operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, computing or analysing a matrix profile.
#[derive(Error, Debug)]
pub enum Error {
    /// A series is empty or has an unusable length.
    #[error("invalid series length: {0}")]
    InvalidLength(String),

    /// Window length is too small, larger than a series, or too large for the
    /// self-join exclusion zone.
    #[error("invalid window length {m}: {reason}")]
    InvalidWindow { m: usize, reason: String },

    /// A series being normalized has zero standard deviation.
    #[error("degenerate series: {0}")]
    DegenerateSeries(String),

    /// An array does not match the profile length.
    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    /// Number of motifs or discords requested is not positive.
    #[error("invalid k: {0} (must be positive)")]
    InvalidK(usize),

    /// Motif radius is not a positive finite number.
    #[error("invalid radius: {0} (must be positive and finite)")]
    InvalidRadius(f64),

    /// Input samples or join kind unsuitable for the operation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Computation option out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Operation requires a computed profile.
    #[error("matrix profile has not been computed")]
    NotComputed,

    /// FFT planning or execution failed.
    #[error("fft failure: {0}")]
    Fft(#[from] realfft::FftError),

    /// Persistence read or write failed.
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted data could not be encoded or decoded.
    #[error("malformed matrix profile data: {0}")]
    Format(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn window(m: usize, reason: impl Into<String>) -> Self {
        Self::InvalidWindow {
            m,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = Error::window(1, "must be at least 2");
        assert_eq!(
            err.to_string(),
            "invalid window length 1: must be at least 2"
        );

        let err = Error::LengthMismatch {
            expected: 10,
            got: 7,
        };
        assert_eq!(err.to_string(), "length mismatch: expected 10, got 7");

        let err = Error::InvalidK(0);
        assert_eq!(err.to_string(), "invalid k: 0 (must be positive)");

        assert_eq!(
            Error::NotComputed.to_string(),
            "matrix profile has not been computed"
        );
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
