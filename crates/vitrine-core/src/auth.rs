//! Auth facade: the one entry point for identity.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, ApiError, ApiRequest, ApiResult};
use crate::session::{Credentials, SessionStore, User};

#[derive(Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignOutRequest {
    all_devices: bool,
}

#[derive(Deserialize)]
struct SignInResponse {
    access_token: String,
    refresh_token: String,
    user: User,
}

/// Login, logout, and session restoration on top of the request pipeline.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn store(&self) -> &Arc<SessionStore> {
        self.client.store()
    }

    /// Signs in. Only admins and staff are accepted; nothing is stored for
    /// anyone else.
    ///
    /// # Errors
    /// `AccessDenied` for non-staff accounts, `Storage` if the session cannot
    /// be saved, or any pipeline error from the sign-in call.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
        let request = ApiRequest::post("/auth/signin")
            .json(&SignInRequest { email, password })?
            .without_refresh();
        let response: SignInResponse = self.client.execute(request).await?;

        if !response.user.role.is_staff() {
            tracing::info!(role = %response.user.role, "Rejected sign-in for non-staff account");
            return Err(ApiError::access_denied());
        }

        self.store()
            .save(
                Credentials::new(response.access_token, response.refresh_token),
                response.user.clone(),
            )
            .map_err(|e| ApiError::storage(&e))?;

        tracing::info!(user_id = %response.user.id, "Signed in");
        Ok(response.user)
    }

    /// Signs out, revoking this session (or every session) on the backend
    /// when reachable. Local state is cleared regardless.
    ///
    /// # Errors
    /// Only if local storage cannot be cleared.
    pub async fn logout(&self, all_devices: bool) -> ApiResult<()> {
        if self.store().access_token().is_some()
            && let Err(err) = self.notify_sign_out(all_devices).await
        {
            tracing::warn!("Backend sign-out failed, clearing local session anyway: {err}");
        }

        self.store().clear().map_err(|e| ApiError::storage(&e))?;
        tracing::info!(all_devices, "Signed out");
        Ok(())
    }

    async fn notify_sign_out(&self, all_devices: bool) -> ApiResult<()> {
        let request = ApiRequest::post("/auth/signout").json(&SignOutRequest { all_devices })?;
        self.client.execute_unit(request).await
    }

    /// Restores a persisted session at startup.
    ///
    /// Non-staff sessions are wiped without contacting the backend. Staff
    /// sessions are re-validated with "who am I"; any failure there means
    /// no session.
    pub async fn restore_session(&self) -> Option<User> {
        let session = match self.store().restore() {
            Ok(Some(session)) => session,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!("Failed to read stored session: {err:#}");
                self.discard_session();
                return None;
            }
        };

        if !session.is_valid() {
            tracing::info!(role = %session.user.role, "Discarding stored non-staff session");
            self.discard_session();
            return None;
        }

        match self.me().await {
            Ok(user) if user.role.is_staff() => {
                let Some(credentials) = self.store().credentials() else {
                    return None;
                };
                if let Err(err) = self.store().save(credentials, user.clone()) {
                    tracing::warn!("Failed to update stored user: {err:#}");
                }
                tracing::info!(user_id = %user.id, "Session restored");
                Some(user)
            }
            Ok(user) => {
                tracing::info!(role = %user.role, "Stored session no longer has dashboard access");
                self.discard_session();
                None
            }
            Err(err) => {
                tracing::info!("Stored session could not be verified: {err}");
                self.discard_session();
                None
            }
        }
    }

    /// "Who am I" for the current access token.
    ///
    /// # Errors
    /// Any pipeline error.
    pub async fn me(&self) -> ApiResult<User> {
        self.client.execute(ApiRequest::get("/auth/me")).await
    }

    /// The signed-in user, from memory. No network call.
    pub fn current_user(&self) -> Option<User> {
        self.store().load().filter(|s| s.is_valid()).map(|s| s.user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    fn discard_session(&self) {
        if let Err(err) = self.store().clear() {
            tracing::warn!("Failed to clear session storage: {err:#}");
        }
    }
}
