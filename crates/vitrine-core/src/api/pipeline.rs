//! Request pipeline.
//!
//! Every backend call goes through [`ApiClient::execute`], which composes the
//! stages in order: attach auth, send, recover a 401 by refreshing once, then
//! unwrap the response envelope.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::RequestBuilder;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{ApiError, ApiResult};
use super::refresh::RefreshCoordinator;
use super::request::{ApiRequest, RequestBody};
use crate::config::Config;
use crate::session::SessionStore;

/// Standard User-Agent header for vitrine API requests.
pub const USER_AGENT: &str = concat!("vitrine/", env!("CARGO_PKG_VERSION"));

const UNAUTHORIZED: u16 = 401;

/// Status and body of a response, read in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: String,
    store: Arc<SessionStore>,
    refresher: RefreshCoordinator,
}

/// Backend client. Cheap to clone; clones share the session and the
/// refresh coordinator.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    /// Creates a client for `base_url` backed by `store`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration, store: Arc<SessionStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        let base_url = base_url.trim_end_matches('/').to_string();
        let refresher = RefreshCoordinator::new(http.clone(), &base_url, Arc::clone(&store));

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                store,
                refresher,
            }),
        })
    }

    /// Creates a client from resolved configuration.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn from_config(config: &Config, store: Arc<SessionStore>) -> Result<Self> {
        let base_url = config.resolve_base_url()?;
        Self::new(&base_url, config.request_timeout(), store)
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.inner.store
    }

    pub fn refresher(&self) -> &RefreshCoordinator {
        &self.inner.refresher
    }

    /// Runs a call through the pipeline and decodes the unwrapped payload.
    ///
    /// # Errors
    /// Transport failures, non-2xx responses, error envelopes, undecodable
    /// payloads, and `SessionExpired` when a 401 could not be recovered.
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        let payload = self.execute_value(request).await?;
        decode(payload)
    }

    /// Runs a call and discards the payload.
    ///
    /// # Errors
    /// Same as [`ApiClient::execute`].
    pub async fn execute_unit(&self, request: ApiRequest) -> ApiResult<()> {
        self.execute_value(request).await.map(drop)
    }

    /// Runs a call and returns the unwrapped payload as JSON.
    ///
    /// # Errors
    /// Same as [`ApiClient::execute`].
    pub async fn execute_value(&self, mut request: ApiRequest) -> ApiResult<Value> {
        loop {
            let token = self.inner.store.access_token();
            let response = self.send(&request, token.as_deref()).await?;

            if response.status == UNAUTHORIZED && request.can_retry_after_unauthorized() {
                request.retried = true;
                self.recover_unauthorized(token.as_deref()).await?;
                continue;
            }

            return unwrap_envelope(response.status, &response.body).inspect_err(|err| {
                tracing::debug!(
                    method = %request.method,
                    path = %request.path,
                    status = response.status,
                    "Request failed: {err}"
                );
            });
        }
    }

    /// Sends one attempt of `request` with `token` as bearer credential.
    ///
    /// # Errors
    /// Only transport-level failures; any HTTP status is returned as a
    /// [`RawResponse`].
    pub async fn send(&self, request: &ApiRequest, token: Option<&str>) -> ApiResult<RawResponse> {
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            retried = request.retried,
            "Sending request"
        );

        let builder = attach_auth(self.build(request)?, token);
        let response = builder.send().await.map_err(|e| ApiError::transport(&e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| ApiError::transport(&e))?;

        Ok(RawResponse { status, body })
    }

    /// Handles a 401 on a call that may still be retried.
    ///
    /// When the token that was sent has since been replaced, the caller just
    /// retries with the current one. Otherwise a refresh is run (or joined);
    /// if it fails the session is torn down.
    async fn recover_unauthorized(&self, sent_token: Option<&str>) -> ApiResult<()> {
        let current = self.inner.store.access_token();
        if let (Some(sent), Some(current)) = (sent_token, current.as_deref())
            && sent != current
        {
            tracing::debug!("Access token already rotated, retrying without refresh");
            return Ok(());
        }

        match self.inner.refresher.refresh().await {
            Ok(_) => Ok(()),
            Err(err) => {
                self.teardown(&err);
                Err(ApiError::session_expired(&err))
            }
        }
    }

    /// Clears the local session after an unrecoverable auth failure.
    fn teardown(&self, cause: &ApiError) {
        tracing::warn!("Signing out after failed token refresh: {cause}");
        if let Err(err) = self.inner.store.clear() {
            tracing::warn!("Failed to clear session storage: {err:#}");
        }
    }

    fn build(&self, request: &ApiRequest) -> ApiResult<RequestBuilder> {
        let url = format!("{}{}", self.inner.base_url, request.path);
        let mut builder = self.inner.http.request(request.method.clone(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        Ok(match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(parts) => builder.multipart(multipart_form(parts)?),
        })
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

/// Adds the bearer credential, if any.
pub fn attach_auth(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

/// Turns a response into its payload or an error.
///
/// - non-2xx: `HttpStatus` error carrying the backend's `message` if any
/// - envelope (`{ error, message, data }`) with a truthy `error`: `Backend` error
/// - envelope otherwise: its `data` (null when absent)
/// - any other body: returned as-is (plain text as a JSON string)
///
/// # Errors
/// See above.
pub fn unwrap_envelope(status: u16, body: &str) -> ApiResult<Value> {
    if !(200..300).contains(&status) {
        return Err(ApiError::http_status(status, body));
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Ok(Value::String(body.to_string()));
    };

    match value {
        Value::Object(mut envelope) if envelope.contains_key("error") => {
            if envelope.get("error").is_some_and(is_truthy) {
                let message = envelope
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                return Err(ApiError::backend(status, message));
            }
            Ok(envelope.remove("data").unwrap_or(Value::Null))
        }
        other => Ok(other),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn decode<T: DeserializeOwned>(payload: Value) -> ApiResult<T> {
    serde_json::from_value(payload)
        .map_err(|e| ApiError::parse(format!("Unexpected response shape: {e}")))
}

fn multipart_form(parts: &[(String, super::request::UploadFile)]) -> ApiResult<Form> {
    let mut form = Form::new();
    for (field, file) in parts {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| {
                ApiError::parse(format!("Invalid MIME type '{}': {e}", file.mime_type))
            })?;
        form = form.part(field.clone(), part);
    }
    Ok(form)
}
