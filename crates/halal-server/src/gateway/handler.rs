use axum::{
    Json,
    extract::{
        Multipart, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use halal::analysis::analyse_image;
use halal::chat::answer_question;
use halal::constants::DEFAULT_CONFIDENCE_THRESHOLD;
use halal::detection::LogoDetection;
use halal::ocr::TextExtractor;

use crate::gateway::error::GatewayError;
use crate::gateway::schema::{AnalysisResponse, ChatReply, ChatRequest};
use crate::gateway::state::HandlerState;
use crate::gateway::upload::receive_image;

#[derive(Debug, Deserialize)]
pub struct AnalyzeParams {
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
}

fn default_confidence_threshold() -> f32 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

/// `POST /api/analyze`: classifies an uploaded label image.
#[instrument(
    skip_all,
    fields(
        file_name = tracing::field::Empty,
        confidence_threshold = tracing::field::Empty
    )
)]
pub async fn analyze_handler<D, O>(
    State(state): State<HandlerState<D, O>>,
    params: Result<Query<AnalyzeParams>, QueryRejection>,
    multipart: Multipart,
) -> Result<Json<AnalysisResponse>, GatewayError>
where
    D: LogoDetection + 'static,
    O: TextExtractor + 'static,
{
    let Query(params) =
        params.map_err(|e| GatewayError::InvalidRequest(format!("Invalid query: {}", e)))?;
    if !params.confidence_threshold.is_finite() {
        return Err(GatewayError::InvalidRequest(
            "confidence_threshold must be a finite number.".to_string(),
        ));
    }
    tracing::Span::current().record("confidence_threshold", params.confidence_threshold);

    let upload = receive_image(multipart).await?;
    tracing::Span::current().record("file_name", upload.file_name());

    let result = analyse_image(&state.ctx, upload.path(), params.confidence_threshold).await?;

    info!(
        logo_detected = result.logo_detected,
        status = %result.status,
        score = result.score,
        "Analysis served"
    );

    Ok(Json(AnalysisResponse::from(result)))
}

/// `POST /api/chat`: ranks KB entries against a question.
#[instrument(skip_all)]
pub async fn chat_handler<D, O>(
    State(state): State<HandlerState<D, O>>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<ChatReply>, GatewayError>
where
    D: LogoDetection + 'static,
    O: TextExtractor + 'static,
{
    let Json(request) =
        body.map_err(|e| GatewayError::InvalidRequest(format!("Invalid JSON body: {}", e)))?;
    let request: ChatRequest = serde_json::from_value(request)
        .map_err(|e| GatewayError::InvalidRequest(format!("Invalid request schema: {}", e)))?;

    if request.question.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(
            "Question must not be empty.".to_string(),
        ));
    }

    let response = answer_question(&state.ctx, &request.question).await?;
    debug!(results = response.results.len(), "Chat served");

    Ok(Json(ChatReply::from(response)))
}
