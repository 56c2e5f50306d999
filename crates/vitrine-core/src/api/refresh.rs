//! Single-flight token refresh.
//!
//! At most one refresh exchange runs at a time. Callers that ask for a refresh
//! while one is in flight join it and receive the same outcome. The in-flight
//! slot is emptied as soon as the exchange settles, so the next request starts
//! a fresh exchange instead of reusing a stale result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiResult};
use super::pipeline::unwrap_envelope;
use crate::logging::mask_token;
use crate::session::{Credentials, SessionStore};

/// Path of the refresh endpoint, relative to the base URL.
pub const REFRESH_PATH: &str = "/auth/refresh";

type SharedRefresh = Shared<BoxFuture<'static, ApiResult<Credentials>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

struct InFlight {
    id: u64,
    outcome: SharedRefresh,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

struct Inner {
    http: reqwest::Client,
    refresh_url: String,
    store: Arc<SessionStore>,
    in_flight: Mutex<Option<InFlight>>,
    next_id: AtomicU64,
}

/// Owns the refresh exchange with the backend.
///
/// Writes new credentials to the store on success. On failure the store is
/// left alone; tearing the session down is the caller's decision.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    pub fn new(http: reqwest::Client, base_url: &str, store: Arc<SessionStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                refresh_url: format!("{}{REFRESH_PATH}", base_url.trim_end_matches('/')),
                store,
                in_flight: Mutex::new(None),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn state(&self) -> RefreshState {
        if self.inner.slot().is_some() {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    /// Refreshes the token pair, joining an exchange already in flight.
    ///
    /// # Errors
    /// Returns a `RefreshFailed` error when no refresh token is stored, the
    /// backend is unreachable, or the backend rejects the token. Nothing is
    /// retried here.
    pub async fn refresh(&self) -> ApiResult<Credentials> {
        self.join_or_start().await
    }

    fn join_or_start(&self) -> SharedRefresh {
        let mut slot = self.inner.slot();
        if let Some(in_flight) = slot.as_ref() {
            tracing::debug!("Joining in-flight token refresh");
            return in_flight.outcome.clone();
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);
        // The exchange runs on its own task so it settles even if every
        // waiter goes away.
        let task = tokio::spawn(async move {
            let outcome = inner.exchange().await;
            inner.settle(id);
            outcome
        });

        let outcome = async move {
            task.await.unwrap_or_else(|err| {
                Err(ApiError::refresh_failed(format!(
                    "Token refresh task failed: {err}"
                )))
            })
        }
        .boxed()
        .shared();

        *slot = Some(InFlight {
            id,
            outcome: outcome.clone(),
        });
        outcome
    }
}

impl Inner {
    fn slot(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Empties the slot if it still holds exchange `id`.
    fn settle(&self, id: u64) {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|in_flight| in_flight.id == id) {
            *slot = None;
        }
    }

    async fn exchange(&self) -> ApiResult<Credentials> {
        let Some(refresh_token) = self.store.refresh_token() else {
            tracing::warn!("Token refresh skipped: no refresh token available");
            return Err(ApiError::refresh_failed("No refresh token available"));
        };

        tracing::debug!(
            refresh_token = %mask_token(&refresh_token),
            "Exchanging refresh token"
        );

        let response = self
            .http
            .post(&self.refresh_url)
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Token refresh request failed: {e}");
                ApiError::refresh_failed("Failed to send token refresh request")
                    .with_details(e.to_string())
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            ApiError::refresh_failed("Failed to read token refresh response")
                .with_status(status)
                .with_details(e.to_string())
        })?;

        let payload = unwrap_envelope(status, &body).map_err(|err| {
            tracing::warn!(status, "Token refresh rejected: {err}");
            ApiError::refresh_failed(format!("Token refresh failed (HTTP {status}): {err}"))
                .with_status(status)
        })?;

        let tokens: TokenResponse = serde_json::from_value(payload).map_err(|e| {
            ApiError::refresh_failed(format!("Failed to parse token refresh response: {e}"))
                .with_status(status)
        })?;

        let credentials = Credentials::new(tokens.access_token, tokens.refresh_token);
        self.store
            .replace_credentials(credentials.clone())
            .map_err(|e| ApiError::refresh_failed(format!("{e:#}")))?;

        tracing::info!("Access token refreshed");
        Ok(credentials)
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refresh_url", &self.inner.refresh_url)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
