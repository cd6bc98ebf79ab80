//! Cross-cutting, shared constants.
//!
//! Defaults for settings live here so the config layer, the models and the tests agree on
//! a single value.
//!
//! # Dimension Invariants
//!
//! The KB embeddings are produced offline by the same sentence model that runs at query
//! time. Their width must equal the embedder's output dimension; use
//! [`validate_embedding_dim`] where the two meet (KB load, app context construction).

/// Output dimension of `all-MiniLM-L6-v2`, also used by the stub embedder.
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Max tokens fed to the sentence model.
pub const DEFAULT_MAX_SEQ_LEN: usize = 256;

/// Cosine similarity a KB match must reach to be trusted as-is.
pub const DEFAULT_SEMANTIC_THRESHOLD: f32 = 0.70;

/// Number of KB entries surfaced for a chatbot question.
pub const DEFAULT_TOP_K_CHAT_RESULTS: usize = 5;

/// Detector confidence used by `/api/analyze` when the caller does not pass one.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Boxes below this score are discarded by the detector before any caller threshold applies.
pub const DETECTOR_PREDICT_FLOOR: f32 = 0.25;

/// Square input size the logo detector is trained on.
pub const DETECTOR_INPUT_SIZE: usize = 640;

/// Default cap on uploaded image size (20 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Explanatory label returned when the halal logo short-circuits analysis.
pub const LOGO_MATCHED_TEXT: &str = "Certified halal logo detected.";

/// Instruction sent with every OCR request.
pub const OCR_PROMPT: &str =
    "Extract all text from this image exactly as it appears. Preserve line breaks and formatting.";

/// Default vision model used for OCR.
pub const DEFAULT_OCR_MODEL: &str = "gemini-2.5-flash";

/// Default base URL of the generative language API.
pub const DEFAULT_OCR_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Error returned when an embedding width does not match what a component expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimValidationError {
    /// Embedding dimension cannot be zero.
    ZeroDimension,
    /// Runtime dimension does not match expected dimension.
    DimensionMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for DimValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroDimension => write!(f, "embedding dimension cannot be zero"),
            Self::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "dimension mismatch: expected {}, got {}",
                    expected, actual
                )
            }
        }
    }
}

impl std::error::Error for DimValidationError {}

/// Validates that a runtime embedding dimension matches the expected dimension.
///
/// # Example
///
/// ```
/// use halal::constants::{validate_embedding_dim, DEFAULT_EMBEDDING_DIM};
///
/// let kb_dim = 384;
/// validate_embedding_dim(kb_dim, DEFAULT_EMBEDDING_DIM).unwrap();
/// ```
pub fn validate_embedding_dim(actual: usize, expected: usize) -> Result<(), DimValidationError> {
    if expected == 0 || actual == 0 {
        return Err(DimValidationError::ZeroDimension);
    }
    if actual != expected {
        return Err(DimValidationError::DimensionMismatch { expected, actual });
    }
    Ok(())
}
