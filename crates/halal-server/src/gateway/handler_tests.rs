use super::*;
use axum::body::Body;
use axum::http::{Method, Request, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

use halal::config::Settings;
use halal::context::AppContext;
use halal::detection::MockLogoDetector;
use halal::embedding::{SentenceConfig, SentenceEmbedder};
use halal::knowledge::{HalalStatus, KbEntry, KnowledgeBase};
use halal::ocr::MockTextExtractor;

use crate::gateway::schema::{AnalysisResponse, ChatReply};
use crate::gateway::upload::suffix_for;

const BOUNDARY: &str = "halal-test-boundary";
const LABEL_TEXT: &str = "Brand X Biscuits\nIngredients: sugar, salt, water.\nStore cool.";

type MockState = HandlerState<MockLogoDetector, MockTextExtractor>;

fn knowledge() -> KnowledgeBase {
    let embedder = SentenceEmbedder::load(SentenceConfig::stub()).expect("stub embedder");
    KnowledgeBase::from_entries(
        vec![
            KbEntry::new("gelatin", "Gelatin (porcine)", HalalStatus::Haram),
            KbEntry::new("sugar salt water", "Sugar, salt, water", HalalStatus::Halal),
            KbEntry::new("e471 emulsifier", "E471 emulsifier", HalalStatus::Doubtful),
        ],
        embedder,
    )
    .expect("test KB")
}

fn setup_state_with(
    settings: Settings,
    detector: MockLogoDetector,
    ocr: MockTextExtractor,
) -> MockState {
    HandlerState::new(AppContext::new(settings, knowledge(), detector, ocr))
}

fn setup_state(detector: MockLogoDetector, ocr: MockTextExtractor) -> MockState {
    setup_state_with(Settings::default(), detector, ocr)
}

/// Builds a multipart body with a single `file` part.
fn multipart_body(file_name: Option<&str>, content_type: &str, data: &[u8]) -> Vec<u8> {
    let disposition = match file_name {
        Some(name) => format!("form-data; name=\"file\"; filename=\"{name}\""),
        None => "form-data; name=\"file\"".to_string(),
    };

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Disposition: {disposition}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn analyze_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

fn png_upload() -> Request<Body> {
    analyze_request(
        "/api/analyze",
        multipart_body(Some("label.png"), "image/png", b"not really a png"),
    )
}

fn chat_request(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn send(state: MockState, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = create_router_with_state(state)
        .oneshot(request)
        .await
        .expect("router response");
    let status = response.status();
    let headers = response.headers().clone();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes()
        .to_vec();
    (status, headers, body)
}

fn detail(body: &[u8]) -> String {
    let json: serde_json::Value = serde_json::from_slice(body).expect("error JSON");
    json["detail"].as_str().unwrap_or_default().to_string()
}

mod probe_tests {
    use super::*;

    #[tokio::test]
    async fn test_health() {
        let state = setup_state(MockLogoDetector::new(false), MockTextExtractor::new("x"));
        let request = Request::get("/healthz").body(Body::empty()).unwrap();

        let (status, headers, body) = send(state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers.get(HALAL_STATUS_HEADER).unwrap(), "healthy");
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_ready_reports_components() {
        let state = setup_state(MockLogoDetector::new(false), MockTextExtractor::new("x"));
        let request = Request::get("/ready").body(Body::empty()).unwrap();

        let (status, _, body) = send(state, request).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["components"]["knowledge_base"], "ready");
        assert_eq!(json["components"]["kb_rows"], 3);
        assert_eq!(json["components"]["embedder_mode"], "stub");
        assert_eq!(json["components"]["logo_detector"], "loaded");
        assert_eq!(json["components"]["ocr"], "configured");
    }

    #[tokio::test]
    async fn test_ready_with_degraded_components() {
        let state = setup_state(
            MockLogoDetector::unavailable(),
            MockTextExtractor::unconfigured(),
        );
        let request = Request::get("/ready").body(Body::empty()).unwrap();

        let (status, _, body) = send(state, request).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["components"]["logo_detector"], "unavailable");
        assert_eq!(json["components"]["ocr"], "missing_credential");
    }
}

mod analyze_tests {
    use super::*;

    #[tokio::test]
    async fn test_logo_detected_skips_ocr() {
        let state = setup_state(MockLogoDetector::new(true), MockTextExtractor::new(LABEL_TEXT));

        let (status, _, body) = send(state.clone(), png_upload()).await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["logo_detected"], true);
        assert_eq!(json["status"], "halal");
        assert_eq!(json["score"], 1.0);
        assert_eq!(json["matched_text"], "Certified halal logo detected.");
        assert_eq!(json["ingredients"], serde_json::json!([]));
        assert!(json["ocr_text"].is_null());
        assert!(json["ingredients_block"].is_null());

        assert_eq!(state.ctx.detector().call_count(), 1);
        assert_eq!(state.ctx.ocr().call_count(), 0);
    }

    #[tokio::test]
    async fn test_ocr_path_matches_kb() {
        let state = setup_state(MockLogoDetector::new(false), MockTextExtractor::new(LABEL_TEXT));

        let (status, _, body) = send(state.clone(), png_upload()).await;
        assert_eq!(status, StatusCode::OK);

        let response: AnalysisResponse = serde_json::from_slice(&body).unwrap();
        assert!(!response.logo_detected);
        assert_eq!(response.ingredients, vec!["sugar", "salt", "water"]);
        assert_eq!(
            response.ingredients_block.as_deref(),
            Some("Ingredients: sugar, salt, water.")
        );
        assert_eq!(response.ocr_text.as_deref(), Some(LABEL_TEXT));
        assert_eq!(response.status, HalalStatus::Halal);
        assert_eq!(response.matched_text, "Sugar, salt, water");
        assert!(response.score > 0.99 && response.score <= 1.0);
        assert_eq!(state.ctx.ocr().call_count(), 1);
    }

    #[tokio::test]
    async fn test_uploaded_file_reaches_detector_with_suffix() {
        let state = setup_state(MockLogoDetector::new(true), MockTextExtractor::new(LABEL_TEXT));
        let request = analyze_request(
            "/api/analyze",
            multipart_body(Some("photo.jpeg"), "image/jpeg", b"jpeg bytes"),
        );

        let (status, _, _) = send(state.clone(), request).await;
        assert_eq!(status, StatusCode::OK);

        let images = state.ctx.detector().images();
        assert_eq!(images.len(), 1);
        assert_eq!(
            images[0].extension().and_then(|e| e.to_str()),
            Some("jpeg")
        );
        assert!(!images[0].exists(), "upload should be removed after the request");
    }

    #[tokio::test]
    async fn test_confidence_threshold_query() {
        let state = setup_state(MockLogoDetector::new(true), MockTextExtractor::new(LABEL_TEXT));
        let request = analyze_request(
            "/api/analyze?confidence_threshold=0.8",
            multipart_body(Some("label.png"), "image/png", b"png"),
        );

        let (status, _, _) = send(state.clone(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.ctx.detector().thresholds(), vec![0.8]);
    }

    #[tokio::test]
    async fn test_default_confidence_threshold() {
        let state = setup_state(MockLogoDetector::new(true), MockTextExtractor::new(LABEL_TEXT));

        let _ = send(state.clone(), png_upload()).await;
        assert_eq!(state.ctx.detector().thresholds(), vec![0.5]);
    }

    #[tokio::test]
    async fn test_invalid_confidence_threshold() {
        let state = setup_state(MockLogoDetector::new(true), MockTextExtractor::new(LABEL_TEXT));
        let request = analyze_request(
            "/api/analyze?confidence_threshold=high",
            multipart_body(Some("label.png"), "image/png", b"png"),
        );

        let (status, _, _) = send(state.clone(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(state.ctx.detector().call_count(), 0);
    }

    #[tokio::test]
    async fn test_non_image_rejected_before_ocr() {
        let state = setup_state(MockLogoDetector::new(false), MockTextExtractor::new(LABEL_TEXT));
        let request = analyze_request(
            "/api/analyze",
            multipart_body(Some("notes.txt"), "text/plain", b"Ingredients: sugar."),
        );

        let (status, headers, body) = send(state.clone(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            headers.get(error::HALAL_ERROR_HEADER).unwrap(),
            "invalid_request"
        );
        assert_eq!(detail(&body), "Only image uploads are supported.");
        assert_eq!(state.ctx.ocr().call_count(), 0);
        assert_eq!(state.ctx.detector().call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_filename() {
        let state = setup_state(MockLogoDetector::new(false), MockTextExtractor::new(LABEL_TEXT));
        let request = analyze_request("/api/analyze", multipart_body(None, "image/png", b"png"));

        let (status, _, body) = send(state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(detail(&body), "Filename is required.");
    }

    #[tokio::test]
    async fn test_missing_file_field() {
        let state = setup_state(MockLogoDetector::new(false), MockTextExtractor::new(LABEL_TEXT));
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{BOUNDARY}--\r\n"
        );
        let request = analyze_request("/api/analyze", body.into_bytes());

        let (status, _, body) = send(state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(detail(&body).contains("'file'"));
    }

    #[tokio::test]
    async fn test_no_ingredients_block_is_bad_request() {
        let state = setup_state(
            MockLogoDetector::new(false),
            MockTextExtractor::new("Best before 2026. Keep dry."),
        );

        let (status, _, body) = send(state, png_upload()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            detail(&body),
            "Unable to locate an 'Ingredients' block in the extracted text."
        );
    }

    #[tokio::test]
    async fn test_ocr_failure_is_server_error() {
        let state = setup_state(
            MockLogoDetector::new(false),
            MockTextExtractor::failing("quota exceeded"),
        );

        let (status, headers, body) = send(state, png_upload()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            headers.get(error::HALAL_ERROR_HEADER).unwrap(),
            "analysis_error"
        );
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], 500);
        assert!(json["detail"].as_str().unwrap().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_missing_credential_is_server_error() {
        let state = setup_state(MockLogoDetector::new(false), MockTextExtractor::unconfigured());

        let (status, _, body) = send(state, png_upload()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(detail(&body), "Gemini API key is not configured");
    }

    #[tokio::test]
    async fn test_detector_failure_is_internal_error() {
        let state = setup_state(
            MockLogoDetector::failing("tensor shape"),
            MockTextExtractor::new(LABEL_TEXT),
        );

        let (status, headers, _) = send(state.clone(), png_upload()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            headers.get(error::HALAL_ERROR_HEADER).unwrap(),
            "internal_error"
        );
        assert_eq!(state.ctx.ocr().call_count(), 0);
    }

    #[tokio::test]
    async fn test_body_limit() {
        let settings = Settings {
            max_upload_bytes: 256,
            ..Settings::default()
        };
        let state = setup_state_with(
            settings,
            MockLogoDetector::new(true),
            MockTextExtractor::new(LABEL_TEXT),
        );
        let request = analyze_request(
            "/api/analyze",
            multipart_body(Some("label.png"), "image/png", &[0u8; 4096]),
        );

        let (status, _, _) = send(state.clone(), request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(state.ctx.detector().call_count(), 0);
    }
}

mod chat_tests {
    use super::*;

    #[tokio::test]
    async fn test_chat_returns_ranked_matches() {
        let state = setup_state(MockLogoDetector::new(false), MockTextExtractor::new("x"));

        let (status, _, body) =
            send(state, chat_request(r#"{"question": "Gelatin?"}"#)).await;
        assert_eq!(status, StatusCode::OK);

        let reply: ChatReply = serde_json::from_slice(&body).unwrap();
        assert_eq!(reply.question, "Gelatin?");
        assert_eq!(reply.results.len(), 3);
        assert_eq!(reply.results[0].matched_text, "Gelatin (porcine)");
        assert_eq!(reply.results[0].status, HalalStatus::Haram);
        assert!(
            reply
                .results
                .windows(2)
                .all(|pair| pair[0].score >= pair[1].score)
        );
        assert!(
            reply
                .results
                .iter()
                .all(|r| (0.0..=1.0).contains(&r.score))
        );
    }

    #[tokio::test]
    async fn test_chat_respects_top_k() {
        let settings = Settings {
            top_k_chat_results: 1,
            ..Settings::default()
        };
        let state = setup_state_with(
            settings,
            MockLogoDetector::new(false),
            MockTextExtractor::new("x"),
        );

        let (status, _, body) =
            send(state, chat_request(r#"{"question": "sugar"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        let reply: ChatReply = serde_json::from_slice(&body).unwrap();
        assert_eq!(reply.results.len(), 1);
    }

    #[tokio::test]
    async fn test_punctuation_only_question_has_no_results() {
        let state = setup_state(MockLogoDetector::new(false), MockTextExtractor::new("x"));

        let (status, _, body) = send(state, chat_request(r#"{"question": "?!"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        let reply: ChatReply = serde_json::from_slice(&body).unwrap();
        assert!(reply.results.is_empty());
    }

    #[tokio::test]
    async fn test_blank_question() {
        let state = setup_state(MockLogoDetector::new(false), MockTextExtractor::new("x"));

        let (status, _, body) = send(state, chat_request(r#"{"question": "   "}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(detail(&body), "Question must not be empty.");
    }

    #[tokio::test]
    async fn test_missing_question_field() {
        let state = setup_state(MockLogoDetector::new(false), MockTextExtractor::new("x"));

        let (status, _, body) = send(state, chat_request(r#"{"query": "gelatin"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(detail(&body).starts_with("Invalid request schema"));
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let state = setup_state(MockLogoDetector::new(false), MockTextExtractor::new("x"));

        let (status, _, body) = send(state, chat_request("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], 400);
    }
}

mod cors_tests {
    use super::*;

    fn preflight(origin: &str) -> Request<Body> {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/chat")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_allowed_origins() {
        assert!(is_allowed_origin("http://localhost:5173"));
        assert!(is_allowed_origin("http://127.0.0.1:5175"));
        assert!(!is_allowed_origin("http://localhost:3000"));
        assert!(!is_allowed_origin("https://localhost:5173"));
        assert!(!is_allowed_origin("http://localhost:5173.evil.com"));
    }

    #[tokio::test]
    async fn test_preflight_from_local_frontend() {
        let state = setup_state(MockLogoDetector::new(false), MockTextExtractor::new("x"));

        let (_, headers, _) = send(state, preflight("http://localhost:5174")).await;
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:5174"
        );
        assert_eq!(
            headers
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn test_preflight_from_unknown_origin() {
        let state = setup_state(MockLogoDetector::new(false), MockTextExtractor::new("x"));

        let (_, headers, _) = send(state, preflight("http://example.com")).await;
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}

mod upload_tests {
    use super::*;

    #[test]
    fn test_suffix_for() {
        assert_eq!(suffix_for("label.jpg"), ".jpg");
        assert_eq!(suffix_for("archive.tar.gz"), ".gz");
        assert_eq!(suffix_for("label"), ".png");
        assert_eq!(suffix_for(".hidden"), ".png");
    }
}
