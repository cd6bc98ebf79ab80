//! Wire shapes for the public endpoints.

use serde::{Deserialize, Serialize};

use halal::analysis::AnalysisResult;
use halal::chat::ChatResponse;
use halal::knowledge::{HalalStatus, SemanticMatchResult};

/// Scores are reported in `[0, 1]`; cosine similarity can dip below zero.
fn clamp_score(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub logo_detected: bool,
    pub status: HalalStatus,
    pub score: f32,
    pub matched_text: String,
    pub ingredients: Vec<String>,
    pub ingredients_block: Option<String>,
    /// `null` when OCR did not run.
    pub ocr_text: Option<String>,
}

impl From<AnalysisResult> for AnalysisResponse {
    fn from(result: AnalysisResult) -> Self {
        Self {
            logo_detected: result.logo_detected,
            status: result.status,
            score: clamp_score(result.score),
            matched_text: result.matched_text,
            ingredients: result.ingredients,
            ingredients_block: result.ingredients_block,
            ocr_text: Some(result.ocr_text).filter(|text| !text.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMatch {
    pub score: f32,
    pub status: HalalStatus,
    pub matched_text: String,
}

impl From<SemanticMatchResult> for ChatMatch {
    fn from(result: SemanticMatchResult) -> Self {
        Self {
            score: clamp_score(result.score),
            status: result.status,
            matched_text: result.matched_text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub question: String,
    pub results: Vec<ChatMatch>,
}

impl From<ChatResponse> for ChatReply {
    fn from(response: ChatResponse) -> Self {
        Self {
            question: response.query,
            results: response.results.into_iter().map(ChatMatch::from).collect(),
        }
    }
}
