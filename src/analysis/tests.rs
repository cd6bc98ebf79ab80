use super::*;
use crate::config::Settings;
use crate::detection::{DetectorError, MockLogoDetector};
use crate::embedding::{SentenceConfig, SentenceEmbedder};
use crate::knowledge::{KbEntry, KnowledgeBase, KnowledgeBaseError};
use crate::ocr::{MockTextExtractor, OcrError};
use tempfile::NamedTempFile;

fn knowledge() -> KnowledgeBase {
    let embedder = SentenceEmbedder::load(SentenceConfig::stub()).unwrap();
    KnowledgeBase::from_entries(
        vec![
            KbEntry::new("gelatin", "Gelatin (porcine)", HalalStatus::Haram),
            KbEntry::new("sugar salt water", "Sugar, salt, water", HalalStatus::Halal),
        ],
        embedder,
    )
    .unwrap()
}

fn context(
    detector: MockLogoDetector,
    ocr: MockTextExtractor,
) -> AppContext<MockLogoDetector, MockTextExtractor> {
    AppContext::new(Settings::default(), knowledge(), detector, ocr)
}

fn image() -> NamedTempFile {
    tempfile::Builder::new().suffix(".png").tempfile().unwrap()
}

#[tokio::test]
async fn test_logo_short_circuits() {
    let ctx = context(
        MockLogoDetector::new(true),
        MockTextExtractor::new("Ingredients: gelatin."),
    );
    let file = image();

    let result = analyse_image(&ctx, file.path(), 0.5).await.unwrap();
    assert_eq!(result, AnalysisResult::certified_logo());
    assert!(result.logo_detected);
    assert_eq!(result.status, HalalStatus::Halal);
    assert_eq!(result.score, 1.0);
    assert!(result.ingredients.is_empty());
    assert!(result.ingredients_block.is_none());
    assert_eq!(result.matched_text, "Certified halal logo detected.");
    assert_eq!(ctx.ocr().call_count(), 0);
}

#[tokio::test]
async fn test_threshold_forwarded_to_detector() {
    let ctx = context(MockLogoDetector::new(false), MockTextExtractor::new("x"));
    let file = image();

    let _ = analyse_image(&ctx, file.path(), 0.8).await;
    assert_eq!(ctx.detector().thresholds(), vec![0.8]);
    assert_eq!(ctx.detector().images(), vec![file.path().to_path_buf()]);
}

#[tokio::test]
async fn test_full_pipeline_exact_match() {
    let ctx = context(
        MockLogoDetector::new(false),
        MockTextExtractor::new("NET WT 200g\nIngredients: Sugar, Salt, Water.\nBest before 2026"),
    );
    let file = image();

    let result = analyse_image(&ctx, file.path(), 0.5).await.unwrap();
    assert!(!result.logo_detected);
    assert_eq!(
        result.ingredients_block.as_deref(),
        Some("Ingredients: Sugar, Salt, Water.")
    );
    assert_eq!(result.ingredients, vec!["Sugar", "Salt", "Water"]);
    assert_eq!(result.status, HalalStatus::Halal);
    assert_eq!(result.matched_text, "Sugar, salt, water");
    assert!((result.score - 1.0).abs() < 1e-4);
    assert!(result.ocr_text.starts_with("NET WT"));
    assert_eq!(ctx.ocr().call_count(), 1);
}

#[tokio::test]
async fn test_weak_match_is_doubtful() {
    let ctx = context(
        MockLogoDetector::new(false),
        MockTextExtractor::new("Ingredients: cocoa mass, emulsifier (soy lecithin)."),
    );
    let file = image();

    let result = analyse_image(&ctx, file.path(), 0.5).await.unwrap();
    assert_eq!(result.ingredients, vec!["cocoa mass", "emulsifier (soy lecithin)"]);
    assert_eq!(result.status, HalalStatus::Doubtful);
    assert!(result.score < 0.70);
}

#[tokio::test]
async fn test_missing_block_is_validation_error() {
    let ctx = context(
        MockLogoDetector::new(false),
        MockTextExtractor::new("Nutrition facts per 100g"),
    );
    let file = image();

    let err = analyse_image(&ctx, file.path(), 0.5).await.unwrap_err();
    assert!(matches!(err, AnalysisError::NoIngredientsBlock));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_empty_list_is_validation_error() {
    let ctx = context(
        MockLogoDetector::new(false),
        MockTextExtractor::new("Ingredients: ."),
    );
    let file = image();

    let err = analyse_image(&ctx, file.path(), 0.5).await.unwrap_err();
    assert!(matches!(err, AnalysisError::NoIngredients));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_ocr_failure_is_resource_error() {
    let ctx = context(
        MockLogoDetector::new(false),
        MockTextExtractor::unconfigured(),
    );
    let file = image();

    let err = analyse_image(&ctx, file.path(), 0.5).await.unwrap_err();
    assert!(matches!(err, AnalysisError::Ocr(OcrError::MissingCredential)));
    assert_eq!(err.kind(), ErrorKind::Resource);
}

#[tokio::test]
async fn test_detector_failure_aborts_before_ocr() {
    let ctx = context(
        MockLogoDetector::failing("cuda out of memory"),
        MockTextExtractor::new("Ingredients: sugar."),
    );
    let file = image();

    let err = analyse_image(&ctx, file.path(), 0.5).await.unwrap_err();
    assert!(matches!(err, AnalysisError::Detector(_)));
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(ctx.ocr().call_count(), 0);
}

#[tokio::test]
async fn test_unavailable_detector_falls_through_to_ocr() {
    let ctx = context(
        MockLogoDetector::unavailable(),
        MockTextExtractor::new("Ingredients: gelatin."),
    );
    let file = image();

    let result = analyse_image(&ctx, file.path(), 0.5).await.unwrap();
    assert!(!result.logo_detected);
    assert_eq!(result.status, HalalStatus::Haram);
}

#[test]
fn test_error_kinds() {
    assert_eq!(
        AnalysisError::KnowledgeBase(KnowledgeBaseError::EmptyIngredients).kind(),
        ErrorKind::Validation
    );
    assert_eq!(
        AnalysisError::KnowledgeBase(KnowledgeBaseError::Empty).kind(),
        ErrorKind::Resource
    );
    assert_eq!(
        AnalysisError::Detector(DetectorError::ImageNotFound {
            path: "x.png".into()
        })
        .kind(),
        ErrorKind::Resource
    );
    assert_eq!(
        AnalysisError::Ocr(OcrError::EmptyResponse).kind(),
        ErrorKind::Resource
    );
}
