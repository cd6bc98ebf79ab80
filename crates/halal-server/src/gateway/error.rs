use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use halal::analysis::{AnalysisError, ErrorKind};
use halal::chat::ChatError;

/// Response header naming the failure class.
pub const HALAL_ERROR_HEADER: &str = "x-halal-error";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    AnalysisFailed(String),

    #[error("{0}")]
    InternalError(String),
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub code: u16,
}

impl From<AnalysisError> for GatewayError {
    fn from(err: AnalysisError) -> Self {
        match err.kind() {
            ErrorKind::Validation => GatewayError::InvalidRequest(err.to_string()),
            ErrorKind::Resource => GatewayError::AnalysisFailed(err.to_string()),
            ErrorKind::Internal => GatewayError::InternalError(err.to_string()),
        }
    }
}

impl From<ChatError> for GatewayError {
    fn from(err: ChatError) -> Self {
        match &err {
            ChatError::Search(e) if e.is_invalid_input() => {
                GatewayError::InvalidRequest(err.to_string())
            }
            _ => GatewayError::InternalError(err.to_string()),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, error_class) = match &self {
            GatewayError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            GatewayError::PayloadTooLarge(_) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large")
            }
            GatewayError::AnalysisFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "analysis_error")
            }
            GatewayError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self, error_class, "Request failed");
        } else {
            tracing::debug!(error = %self, error_class, "Request rejected");
        }

        let mut headers = HeaderMap::new();
        headers.insert(HALAL_ERROR_HEADER, HeaderValue::from_static(error_class));

        let body = Json(ErrorResponse {
            detail: self.to_string(),
            code: status.as_u16(),
        });

        (status, headers, body).into_response()
    }
}
