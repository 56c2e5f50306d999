//! Image uploads.

use std::path::Path;

use futures_util::future::try_join_all;
use serde::Deserialize;

use super::error::{ApiError, ApiResult};
use super::pipeline::ApiClient;
use super::request::{ApiRequest, UploadFile};

/// The backend answers either `{ "url": ... }` or a bare URL string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UploadResponse {
    Object { url: String },
    Url(String),
}

impl UploadResponse {
    fn into_url(self) -> String {
        match self {
            UploadResponse::Object { url } | UploadResponse::Url(url) => url,
        }
    }
}

impl UploadFile {
    /// Reads an image from disk, guessing the MIME type from its extension.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a known image
    /// type.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let mime_type = image_mime_type(path).with_context(|| {
            format!("{} is not a supported image type", path.display())
        })?;
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().to_string());

        Ok(Self::new(file_name, mime_type, bytes))
    }
}

/// MIME type for common image extensions.
pub fn image_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "avif" => Some("image/avif"),
        _ => None,
    }
}

impl ApiClient {
    /// Uploads one image and returns its public URL.
    ///
    /// # Errors
    /// Any pipeline error, or `Parse` if the response carries no URL.
    pub async fn upload_image(&self, file: UploadFile) -> ApiResult<String> {
        let request = ApiRequest::post("/upload/image").multipart_file("file", file);
        let response: UploadResponse = self.execute(request).await?;
        let url = response.into_url();
        if url.trim().is_empty() {
            return Err(ApiError::parse("Upload response did not include a URL"));
        }
        Ok(url)
    }

    /// Uploads images concurrently; URLs come back in input order.
    ///
    /// # Errors
    /// Fails with the first error if any upload fails.
    pub async fn upload_images(&self, files: Vec<UploadFile>) -> ApiResult<Vec<String>> {
        try_join_all(files.into_iter().map(|file| self.upload_image(file))).await
    }
}
