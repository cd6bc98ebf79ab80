use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{OcrError, TextExtractor};

/// Scripted OCR adapter for tests.
#[derive(Debug)]
pub struct MockTextExtractor {
    response: Result<String, String>,
    configured: bool,
    calls: AtomicUsize,
}

impl MockTextExtractor {
    /// Answers every call with `text` (trimmed; blank text is reported as empty).
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            configured: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails every call with an upstream error carrying `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            response: Err(reason.into()),
            ..Self::new("")
        }
    }

    /// Behaves like an adapter with no credential.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new("")
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextExtractor for MockTextExtractor {
    async fn extract_text(&self, image: &Path) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !image.exists() {
            return Err(OcrError::ImageNotFound {
                path: image.to_path_buf(),
            });
        }
        if !self.configured {
            return Err(OcrError::MissingCredential);
        }

        match &self.response {
            Ok(text) if text.trim().is_empty() => Err(OcrError::EmptyResponse),
            Ok(text) => Ok(text.trim().to_string()),
            Err(reason) => Err(OcrError::Upstream {
                status: 500,
                body: reason.clone(),
            }),
        }
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}
