use thiserror::Error;

use crate::detection::DetectorError;
use crate::knowledge::KnowledgeBaseError;
use crate::ocr::OcrError;

/// Broad failure class, used to pick an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input cannot be analysed (maps to 400).
    Validation,
    /// A model, file or remote service was missing or failed (maps to 500).
    Resource,
    /// Anything else (maps to 500).
    Internal,
}

/// Errors that abort an analysis. No partial result is produced.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Unable to locate an 'Ingredients' block in the extracted text.")]
    NoIngredientsBlock,

    #[error("Failed to parse ingredients from the detected block.")]
    NoIngredients,

    #[error(transparent)]
    Detector(#[from] DetectorError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error(transparent)]
    KnowledgeBase(#[from] KnowledgeBaseError),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::NoIngredientsBlock | AnalysisError::NoIngredients => {
                ErrorKind::Validation
            }
            AnalysisError::KnowledgeBase(e) if e.is_invalid_input() => ErrorKind::Validation,
            AnalysisError::Detector(DetectorError::ImageDecode { .. }) => ErrorKind::Validation,
            AnalysisError::Detector(DetectorError::InferenceFailed { .. }) => ErrorKind::Internal,
            AnalysisError::Detector(_) | AnalysisError::Ocr(_) => ErrorKind::Resource,
            AnalysisError::KnowledgeBase(KnowledgeBaseError::Embedding(_)) => ErrorKind::Internal,
            AnalysisError::KnowledgeBase(_) => ErrorKind::Resource,
            AnalysisError::Join(_) => ErrorKind::Internal,
        }
    }
}
