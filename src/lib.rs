//! Halal label classification library (used by the server and integration tests).
//!
//! # Public API Surface
//!
//! ## Pipeline
//! - [`analyse_image`], [`AnalysisResult`], [`AnalysisError`] - Logo check, OCR, parsing, KB match
//! - [`answer_question`], [`ChatResponse`] - Chatbot search over the KB
//! - [`AppContext`] - Startup singletons shared by every request
//!
//! ## Components
//! - [`KnowledgeBase`], [`HalalStatus`], [`resolve_status`] - Semantic KB matching
//! - [`SentenceEmbedder`], [`SentenceConfig`] - Text embeddings (model or stub)
//! - [`LogoDetection`], [`YoloLogoDetector`] - Halal logo detection
//! - [`TextExtractor`], [`GeminiOcr`] - Label OCR
//! - [`text`] - Normalization and ingredient parsing
//!
//! ## Configuration
//! - [`Settings`], [`ConfigError`] - `HALAL_*` environment settings
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod analysis;
pub mod chat;
pub mod config;
pub mod constants;
pub mod context;
pub mod detection;
pub mod embedding;
pub mod knowledge;
pub mod ocr;
pub mod text;

pub use analysis::{AnalysisError, AnalysisResult, ErrorKind, analyse_image};
pub use chat::{ChatError, ChatResponse, answer_question};
pub use config::{ConfigError, Settings};
pub use constants::{DimValidationError, validate_embedding_dim};
pub use context::{AppContext, ContextError, DefaultAppContext};
#[cfg(any(test, feature = "mock"))]
pub use detection::MockLogoDetector;
pub use detection::{DetectorError, LogoDetection, ModelSize, WeightTrust, YoloLogoDetector};
pub use embedding::{EmbeddingError, SentenceConfig, SentenceEmbedder};
pub use knowledge::{
    HalalStatus, KbEntry, KnowledgeBase, KnowledgeBaseError, SemanticMatchResult, resolve_status,
};
#[cfg(any(test, feature = "mock"))]
pub use ocr::MockTextExtractor;
pub use ocr::{GeminiOcr, OcrError, TextExtractor};
pub use text::{find_ingredients_block, normalize, parse_ingredients_list};
