//! Multipart image uploads spooled to a temporary file.

use std::io::Write;
use std::path::Path;

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::gateway::error::GatewayError;

/// Multipart field carrying the image.
pub const UPLOAD_FIELD: &str = "file";

const DEFAULT_SUFFIX: &str = ".png";

/// An uploaded image on disk. The file is removed when this value is dropped.
#[derive(Debug)]
pub struct ImageUpload {
    file_name: String,
    file: NamedTempFile,
}

impl ImageUpload {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Returns the upload's extension as a temp file suffix (`.png` when absent).
pub fn suffix_for(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_else(|| DEFAULT_SUFFIX.to_string())
}

/// Pulls the `file` field out of the form, checks it is a named image and writes it to disk.
///
/// Other fields are skipped.
pub async fn receive_image(mut multipart: Multipart) -> Result<ImageUpload, GatewayError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| GatewayError::InvalidRequest("Filename is required.".to_string()))?;

        let is_image = field
            .content_type()
            .is_some_and(|content_type| content_type.starts_with("image/"));
        if !is_image {
            return Err(GatewayError::InvalidRequest(
                "Only image uploads are supported.".to_string(),
            ));
        }

        let bytes = field.bytes().await.map_err(multipart_error)?;
        let suffix = suffix_for(&file_name);
        debug!(file_name = %file_name, bytes = bytes.len(), "Received upload");

        let file = tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
            let mut file = tempfile::Builder::new()
                .prefix("halal-upload-")
                .suffix(&suffix)
                .tempfile()?;
            file.write_all(&bytes)?;
            file.flush()?;
            Ok(file)
        })
        .await
        .map_err(|e| GatewayError::InternalError(e.to_string()))?
        .map_err(|e| GatewayError::InternalError(format!("Failed to store upload: {}", e)))?;

        return Ok(ImageUpload { file_name, file });
    }

    Err(GatewayError::InvalidRequest(format!(
        "Multipart field '{UPLOAD_FIELD}' is required."
    )))
}

fn multipart_error(err: MultipartError) -> GatewayError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GatewayError::PayloadTooLarge(err.body_text())
    } else {
        GatewayError::InvalidRequest(err.body_text())
    }
}

