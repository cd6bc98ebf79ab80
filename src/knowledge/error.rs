use std::path::PathBuf;
use thiserror::Error;

use crate::constants::DimValidationError;
use crate::embedding::EmbeddingError;

/// Errors raised while loading or querying the knowledge base.
#[derive(Debug, Error)]
pub enum KnowledgeBaseError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid KB table {path}: {reason}")]
    InvalidTable { path: PathBuf, reason: String },

    #[error("invalid KB embeddings {path}: {reason}")]
    InvalidEmbeddings { path: PathBuf, reason: String },

    #[error("knowledge base is empty")]
    Empty,

    /// Rows and embeddings are matched by index, so the counts must agree.
    #[error("KB has {rows} rows but {embeddings} embeddings")]
    LengthMismatch { rows: usize, embeddings: usize },

    #[error("embedding row {row} has width {actual}, expected {expected}")]
    InconsistentWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("KB embeddings do not match the embedder: {0}")]
    Dimension(#[from] DimValidationError),

    #[error("Ingredient list is empty.")]
    EmptyIngredients,

    #[error("Failed to normalise ingredient list for matching.")]
    UnmatchableIngredients,

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

impl KnowledgeBaseError {
    /// Returns `true` when the error stems from caller input rather than the KB or model.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            KnowledgeBaseError::EmptyIngredients | KnowledgeBaseError::UnmatchableIngredients
        )
    }
}
