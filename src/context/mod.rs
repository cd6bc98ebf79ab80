//! Startup singletons, built once and shared by every request.


use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::Settings;
use crate::detection::{DetectorError, LogoDetection, WeightTrust, YoloLogoDetector};
use crate::embedding::{EmbeddingError, SentenceConfig, SentenceEmbedder};
use crate::knowledge::{KnowledgeBase, KnowledgeBaseError};
use crate::ocr::{GeminiOcr, TextExtractor};

/// Errors raised while building the [`AppContext`].
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("failed to load sentence embedder: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("failed to load knowledge base: {0}")]
    KnowledgeBase(#[from] KnowledgeBaseError),

    #[error("failed to load logo detector: {0}")]
    Detector(#[from] DetectorError),
}

/// Settings, KB (with its embedder), logo detector and OCR adapter.
///
/// Cheap to clone; every component sits behind an `Arc` and is read-only after startup.
pub struct AppContext<D, O> {
    settings: Arc<Settings>,
    knowledge: Arc<KnowledgeBase>,
    detector: Arc<D>,
    ocr: Arc<O>,
}

impl<D, O> Clone for AppContext<D, O> {
    fn clone(&self) -> Self {
        Self {
            settings: Arc::clone(&self.settings),
            knowledge: Arc::clone(&self.knowledge),
            detector: Arc::clone(&self.detector),
            ocr: Arc::clone(&self.ocr),
        }
    }
}

impl<D, O> std::fmt::Debug for AppContext<D, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("settings", &self.settings)
            .field("knowledge", &self.knowledge)
            .finish_non_exhaustive()
    }
}

impl<D, O> AppContext<D, O>
where
    D: LogoDetection + 'static,
    O: TextExtractor + 'static,
{
    pub fn new(settings: Settings, knowledge: KnowledgeBase, detector: D, ocr: O) -> Self {
        Self {
            settings: Arc::new(settings),
            knowledge: Arc::new(knowledge),
            detector: Arc::new(detector),
            ocr: Arc::new(ocr),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeBase> {
        &self.knowledge
    }

    pub fn detector(&self) -> &Arc<D> {
        &self.detector
    }

    pub fn ocr(&self) -> &Arc<O> {
        &self.ocr
    }
}

/// Production context: YOLOv8 detector and Gemini OCR.
pub type DefaultAppContext = AppContext<YoloLogoDetector, GeminiOcr>;

impl AppContext<YoloLogoDetector, GeminiOcr> {
    /// Loads every component described by `settings`.
    ///
    /// Without `embedding_model_path` the embedder runs in stub mode, which only matches KB
    /// embeddings produced by the stub.
    pub fn from_settings(settings: Settings) -> Result<Self, ContextError> {
        let embedder = load_embedder(&settings)?;

        let knowledge = KnowledgeBase::load(
            &settings.kb_table_path,
            &settings.kb_embeddings_path,
            embedder,
        )?;

        let detector = YoloLogoDetector::load(
            &settings.logo_weights_path,
            settings.logo_model_size,
            settings.logo_num_classes,
            WeightTrust::from_flag(settings.trust_logo_weights),
        )?;

        let ocr = GeminiOcr::from_settings(&settings);

        info!(
            kb_rows = knowledge.len(),
            logo_detector = detector.is_available(),
            ocr_configured = ocr.is_configured(),
            "Application context ready"
        );

        Ok(Self::new(settings, knowledge, detector, ocr))
    }
}

fn load_embedder(settings: &Settings) -> Result<SentenceEmbedder, EmbeddingError> {
    let config = match &settings.embedding_model_path {
        Some(path) => SentenceConfig::new(path),
        None => {
            warn!("HALAL_EMBEDDING_MODEL_PATH not set; using stub sentence embedder");
            SentenceConfig::stub()
        }
    };
    SentenceEmbedder::load(config)
}
