//! Label analysis pipeline.
//!
//! `logo check -> done(halal)` when the certification logo is found, otherwise
//! `OCR -> ingredients block -> ingredient list -> KB match`. Any failure aborts the run.

mod error;

#[cfg(test)]
mod tests;

pub use error::{AnalysisError, ErrorKind};

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::constants::LOGO_MATCHED_TEXT;
use crate::context::AppContext;
use crate::detection::LogoDetection;
use crate::knowledge::HalalStatus;
use crate::ocr::TextExtractor;
use crate::text::{find_ingredients_block, parse_ingredients_list};

/// Outcome of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub logo_detected: bool,
    /// Full OCR transcript; empty when the logo short-circuited the run.
    pub ocr_text: String,
    pub ingredients_block: Option<String>,
    pub ingredients: Vec<String>,
    pub status: HalalStatus,
    pub score: f32,
    pub matched_text: String,
}

impl AnalysisResult {
    /// Result reported when the halal certification logo is detected.
    pub fn certified_logo() -> Self {
        Self {
            logo_detected: true,
            ocr_text: String::new(),
            ingredients_block: None,
            ingredients: Vec::new(),
            status: HalalStatus::Halal,
            score: 1.0,
            matched_text: LOGO_MATCHED_TEXT.to_string(),
        }
    }
}

/// Runs the full pipeline on an image file.
///
/// Detection and KB matching run on the blocking pool.
#[instrument(skip(ctx, image), fields(image = %image.display()))]
pub async fn analyse_image<D, O>(
    ctx: &AppContext<D, O>,
    image: &Path,
    confidence_threshold: f32,
) -> Result<AnalysisResult, AnalysisError>
where
    D: LogoDetection + 'static,
    O: TextExtractor + 'static,
{
    let detector = Arc::clone(ctx.detector());
    let path = image.to_path_buf();
    let logo_detected =
        tokio::task::spawn_blocking(move || detector.detect(&path, confidence_threshold))
            .await??;

    if logo_detected {
        info!("Halal logo detected; skipping OCR");
        return Ok(AnalysisResult::certified_logo());
    }

    let ocr_text = ctx.ocr().extract_text(image).await?;

    let ingredients_block =
        find_ingredients_block(&ocr_text).ok_or(AnalysisError::NoIngredientsBlock)?;

    let ingredients = parse_ingredients_list(&ingredients_block);
    if ingredients.is_empty() {
        return Err(AnalysisError::NoIngredients);
    }
    debug!(count = ingredients.len(), "Parsed ingredients");

    let knowledge = Arc::clone(ctx.knowledge());
    let threshold = ctx.settings().semantic_threshold;
    let tokens = ingredients.clone();
    let matched =
        tokio::task::spawn_blocking(move || knowledge.classify(&tokens, threshold)).await??;

    info!(
        status = %matched.status,
        score = matched.score,
        ingredients = ingredients.len(),
        "Analysis complete"
    );

    Ok(AnalysisResult {
        logo_detected: false,
        ocr_text,
        ingredients_block: Some(ingredients_block),
        ingredients,
        status: matched.status,
        score: matched.score,
        matched_text: matched.matched_text,
    })
}
