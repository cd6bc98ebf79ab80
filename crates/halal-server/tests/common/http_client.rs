//! HTTP client helpers for tests.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(DEFAULT_TIMEOUT_SECS);

pub struct TestClient {
    client: reqwest::Client,
    base_url: String,
}

impl TestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url, path)
    }

    /// Uploads `data` as the `file` field of `/api/analyze`.
    pub async fn analyze(
        &self,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
        confidence_threshold: Option<f32>,
    ) -> Result<AnalysisResponse, TestClientError> {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(content_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let mut builder = self.client.post(self.url("/api/analyze"));
        if let Some(threshold) = confidence_threshold {
            builder = builder.query(&[("confidence_threshold", threshold)]);
        }

        let resp = builder.multipart(form).send().await?;
        Self::parse(resp).await
    }

    pub async fn chat(&self, question: &str) -> Result<ChatReply, TestClientError> {
        let resp = self
            .client
            .post(self.url("/api/chat"))
            .json(&serde_json::json!({ "question": question }))
            .send()
            .await?;
        Self::parse(resp).await
    }

    pub async fn health(&self) -> Result<HealthResponse, TestClientError> {
        let resp = self.client.get(self.url("/healthz")).send().await?;
        Self::parse(resp).await
    }

    pub async fn ready(&self) -> Result<ReadyResponse, TestClientError> {
        let resp = self.client.get(self.url("/ready")).send().await?;
        Self::parse(resp).await
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, TestClientError> {
        match resp.status().as_u16() {
            200 => Ok(resp.json().await?),
            400 => {
                let body: ErrorResponse = resp.json().await?;
                Err(TestClientError::BadRequest(body.detail))
            }
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(TestClientError::UnexpectedStatus(status, body))
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ComponentStatus {
    pub knowledge_base: String,
    pub kb_rows: usize,
    pub embedder_mode: String,
    pub logo_detector: String,
    pub ocr: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub components: ComponentStatus,
}

impl ReadyResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisResponse {
    pub logo_detected: bool,
    pub status: String,
    pub score: f32,
    pub matched_text: String,
    pub ingredients: Vec<String>,
    pub ingredients_block: Option<String>,
    pub ocr_text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatMatch {
    pub score: f32,
    pub status: String,
    pub matched_text: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatReply {
    pub question: String,
    pub results: Vec<ChatMatch>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    detail: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TestClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {0} - Body: {1}")]
    UnexpectedStatus(u16, String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_url_building() {
        let client = TestClient::new("http://localhost:8000");
        assert_eq!(client.url("/healthz"), "http://localhost:8000/healthz");
        assert_eq!(client.url("api/chat"), "http://localhost:8000/api/chat");
    }
}
