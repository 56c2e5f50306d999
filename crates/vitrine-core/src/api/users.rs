//! Customer listing and sign-in session management.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::ApiResult;
use super::pipeline::ApiClient;
use super::request::{ApiRequest, resource_path};
use crate::session::{Role, User};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    pub role: Option<Role>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// A sign-in session as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    /// Fields this client does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ApiClient {
    /// # Errors
    /// Any pipeline error.
    pub async fn list_users(&self, query: &UserQuery) -> ApiResult<Vec<User>> {
        let request = ApiRequest::get("/users")
            .query_opt("role", query.role.map(Role::as_str))
            .query_opt("limit", query.limit)
            .query_opt("offset", query.offset);
        self.execute(request).await
    }

    /// # Errors
    /// Any pipeline error.
    pub async fn list_sessions(&self) -> ApiResult<Vec<AuthSession>> {
        self.execute(ApiRequest::get("/auth/sessions")).await
    }

    /// # Errors
    /// Any pipeline error.
    pub async fn revoke_session(&self, session_id: &str) -> ApiResult<()> {
        self.execute_unit(ApiRequest::delete(resource_path("/auth/sessions", session_id)?))
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_session_keeps_unknown_fields() {
        let session: AuthSession = serde_json::from_value(json!({
            "id": "s1",
            "userAgent": "Mozilla/5.0",
            "revoked": false
        }))
        .unwrap();

        assert_eq!(session.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(session.extra.get("revoked"), Some(&json!(false)));
    }
}
