//! Replayable description of a backend call.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::error::{ApiError, ApiResult};

/// File attached to a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// Appends `id` to `collection` as one percent-encoded path segment.
///
/// # Errors
/// Returns an `InvalidInput` error for an empty id or a dot segment, which
/// would otherwise address the collection or its parent.
pub fn resource_path(collection: &str, id: &str) -> ApiResult<String> {
    if matches!(id.trim(), "" | "." | "..") {
        return Err(ApiError::invalid_input(format!("Invalid resource id: {id:?}")));
    }

    let mut url = Url::parse("http://localhost")
        .map_err(|e| ApiError::invalid_input(format!("Failed to build resource path: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| ApiError::invalid_input("Failed to build resource path"))?
        .pop_if_empty()
        .push(id);

    Ok(format!("{}{}", collection.trim_end_matches('/'), url.path()))
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// Multipart form: (field name, file)
    Multipart(Vec<(String, UploadFile)>),
}

/// A backend call that can be issued again after a token refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the base URL, e.g. `/products`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    /// Set once the call has been re-issued after a 401.
    pub retried: bool,
    /// Whether a 401 may trigger a token refresh.
    pub allow_refresh: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            retried: false,
            allow_refresh: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Serializes `body` as the JSON payload.
    ///
    /// # Errors
    /// Returns a `Parse` error if the body cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> ApiResult<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::parse(format!("Failed to encode request body: {e}")))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    /// Adds a query parameter when a value is present.
    #[must_use]
    pub fn query_opt(mut self, key: &str, value: Option<impl ToString>) -> Self {
        if let Some(value) = value {
            self.query.push((key.to_string(), value.to_string()));
        }
        self
    }

    #[must_use]
    pub fn multipart_file(mut self, field: &str, file: UploadFile) -> Self {
        match &mut self.body {
            RequestBody::Multipart(parts) => parts.push((field.to_string(), file)),
            _ => self.body = RequestBody::Multipart(vec![(field.to_string(), file)]),
        }
        self
    }

    /// Disables refresh-and-retry for this call (e.g. sign-in).
    #[must_use]
    pub fn without_refresh(mut self) -> Self {
        self.allow_refresh = false;
        self
    }

    /// Whether a 401 on this call may still be recovered.
    pub fn can_retry_after_unauthorized(&self) -> bool {
        self.allow_refresh && !self.retried
    }
}
