//! HTTP gateway (Axum) for label analysis and KB chat.
//!
//! This module is primarily used by the `halal-server` binary.

pub mod error;
pub mod handler;
pub mod schema;
pub mod state;
pub mod upload;

#[cfg(test)]
mod handler_tests;

use std::sync::LazyLock;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, HeaderValue, StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use regex::Regex;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::GatewayError;
pub use handler::{analyze_handler, chat_handler};
pub use state::HandlerState;

use halal::detection::LogoDetection;
use halal::ocr::TextExtractor;

/// Response header carrying the service status on health probes.
pub const HALAL_STATUS_HEADER: &str = "x-halal-status";

/// Local frontend dev servers allowed to call the API with credentials.
static LOCAL_ORIGIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^http://(localhost|127\.0\.0\.1):(5173|5174|5175)$").unwrap());

pub fn is_allowed_origin(origin: &str) -> bool {
    LOCAL_ORIGIN_RE.is_match(origin)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            |origin: &HeaderValue, _: &Parts| origin.to_str().is_ok_and(is_allowed_origin),
        ))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

pub fn create_router_with_state<D, O>(state: HandlerState<D, O>) -> Router
where
    D: LogoDetection + 'static,
    O: TextExtractor + 'static,
{
    let body_limit = state.max_upload_bytes();

    Router::new()
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/api/analyze", post(analyze_handler))
        .route("/api/chat", post(chat_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(serde::Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub components: ComponentStatus,
}

#[derive(serde::Serialize)]
pub struct ComponentStatus {
    pub knowledge_base: &'static str,
    pub kb_rows: usize,
    pub embedder_mode: &'static str,
    pub logo_detector: &'static str,
    pub ocr: &'static str,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(HALAL_STATUS_HEADER, HeaderValue::from_static("healthy"));

    (
        StatusCode::OK,
        headers,
        Json(HealthResponse { status: "ok" }),
    )
        .into_response()
}

/// Reports which components are usable. Only an empty KB makes the service unready; a
/// missing detector or OCR credential degrades individual requests instead.
#[tracing::instrument(skip(state))]
pub async fn ready_handler<D, O>(State(state): State<HandlerState<D, O>>) -> Response
where
    D: LogoDetection + 'static,
    O: TextExtractor + 'static,
{
    let knowledge = state.ctx.knowledge();

    let components = ComponentStatus {
        knowledge_base: if knowledge.is_empty() { "empty" } else { "ready" },
        kb_rows: knowledge.len(),
        embedder_mode: if knowledge.embedder().is_stub() {
            "stub"
        } else {
            "real"
        },
        logo_detector: if state.ctx.detector().is_available() {
            "loaded"
        } else {
            "unavailable"
        },
        ocr: if state.ctx.ocr().is_configured() {
            "configured"
        } else {
            "missing_credential"
        },
    };

    let is_ready = components.knowledge_base == "ready";
    let (status_code, status_msg) = if is_ready {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "pending")
    };

    let mut headers = HeaderMap::new();
    headers.insert(HALAL_STATUS_HEADER, HeaderValue::from_static(status_msg));

    (
        status_code,
        headers,
        Json(ReadyResponse {
            status: status_msg,
            components,
        }),
    )
        .into_response()
}
