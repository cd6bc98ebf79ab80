use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while extracting text from an image.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image not found: {path}")]
    ImageNotFound { path: PathBuf },

    #[error("Gemini API key is not configured")]
    MissingCredential,

    #[error("failed to read image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("OCR request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OCR service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("OCR model returned empty response")]
    EmptyResponse,
}
