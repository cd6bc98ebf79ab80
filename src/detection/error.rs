use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the logo detector.
#[derive(Debug, Error)]
pub enum DetectorError {
    /// Only safetensors weights are accepted.
    #[error("unsupported weights format (expected .safetensors): {path}")]
    UnsupportedWeights { path: PathBuf },

    #[error("failed to load detector weights from {path}: {reason}")]
    LoadFailed { path: PathBuf, reason: String },

    #[error("image not found: {path}")]
    ImageNotFound { path: PathBuf },

    #[error("failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("detector inference failed: {reason}")]
    InferenceFailed { reason: String },
}

impl From<candle_core::Error> for DetectorError {
    fn from(err: candle_core::Error) -> Self {
        DetectorError::InferenceFailed {
            reason: err.to_string(),
        }
    }
}
