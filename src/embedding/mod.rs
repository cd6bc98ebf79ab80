//! Embedding + model utilities.
//!
//! - [`sentence`] turns normalized text into unit-length vectors for KB matching.
//! - [`device`] picks the compute device shared by every candle model in the crate.

/// BERT encoder with mean pooling (sentence-transformers layout).
pub mod bert;
/// Device selection (CPU / Metal / CUDA).
pub mod device;
mod error;
/// Sentence embedder used for KB matching.
pub mod sentence;
/// Tokenizer loading helpers.
pub mod utils;

pub use error::EmbeddingError;
pub use sentence::{SentenceConfig, SentenceEmbedder};
