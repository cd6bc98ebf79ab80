//! Label text extraction through a remote vision-language model.
//!
//! [`GeminiOcr`] sends the image inline (base64) with a fixed instruction prompt to the
//! `generateContent` endpoint and returns the concatenated, trimmed text parts. There is no
//! retry and no timeout beyond the HTTP client's defaults.

mod error;
#[cfg(any(test, feature = "mock"))]
mod mock;


pub use error::OcrError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockTextExtractor;

use std::path::Path;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::Settings;
use crate::constants::OCR_PROMPT;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

#[async_trait]
/// Extracts the text printed on a product image.
pub trait TextExtractor: Send + Sync {
    /// Returns the trimmed text found in `image`.
    async fn extract_text(&self, image: &Path) -> Result<String, OcrError>;
    /// Returns `true` when a credential is available.
    fn is_configured(&self) -> bool;
}

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiOcr {
    http: HttpClient,
    api_key: String,
    model: String,
    base_url: String,
    prompt: String,
}

impl std::fmt::Debug for GeminiOcr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiOcr")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl GeminiOcr {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http: HttpClient::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            prompt: OCR_PROMPT.to_string(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let ocr = Self::new(
            settings.gemini_api_key.clone(),
            settings.ocr_model.clone(),
            settings.ocr_base_url.clone(),
        );
        if !ocr.is_configured() {
            warn!("Gemini API key not configured; OCR requests will fail");
        }
        ocr
    }

    /// Replaces the instruction prompt.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl TextExtractor for GeminiOcr {
    #[instrument(skip(self), fields(model = %self.model))]
    async fn extract_text(&self, image: &Path) -> Result<String, OcrError> {
        if !image.exists() {
            return Err(OcrError::ImageNotFound {
                path: image.to_path_buf(),
            });
        }
        if !self.is_configured() {
            return Err(OcrError::MissingCredential);
        }

        let bytes = tokio::fs::read(image)
            .await
            .map_err(|source| OcrError::Io {
                path: image.to_path_buf(),
                source,
            })?;
        let mime_type = guess_mime_type(image, &bytes);

        debug!(bytes = bytes.len(), mime_type, "Sending image for OCR");

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    RequestPart::Text {
                        text: self.prompt.clone(),
                    },
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data: STANDARD.encode(&bytes),
                        },
                    },
                ],
            }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "OCR request rejected");
            return Err(OcrError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text = parsed.text();
        let text = text.trim();
        if text.is_empty() {
            return Err(OcrError::EmptyResponse);
        }

        debug!(chars = text.len(), "OCR complete");
        Ok(text.to_string())
    }

    fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Sniffs the image format from content, then from the extension; defaults to PNG.
pub fn guess_mime_type(path: &Path, bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .or_else(|_| image::ImageFormat::from_path(path))
        .map(|format| format.to_mime_type())
        .unwrap_or("image/png")
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}
