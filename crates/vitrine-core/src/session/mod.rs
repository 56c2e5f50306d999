//! Session state: credentials, the cached user record, and their storage.

mod store;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use store::{FileBackend, MemoryBackend, PersistedSession, SessionBackend, SessionStore};

/// Opaque bearer token pair. Both tokens are always replaced together.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &crate::logging::mask_token(&self.access_token))
            .field("refresh_token", &crate::logging::mask_token(&self.refresh_token))
            .finish()
    }
}

/// Account role as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Staff,
    Customer,
}

impl Role {
    /// Only admins and staff may use the dashboard.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::Staff)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Staff => "STAFF",
            Role::Customer => "CUSTOMER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// User record cached alongside the credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

impl User {
    /// Human-friendly name: "First Last" when a profile has one, else the email.
    pub fn display_name(&self) -> String {
        let name = self
            .profile
            .as_ref()
            .map(|p| {
                [p.first_name.as_deref(), p.last_name.as_deref()]
                    .into_iter()
                    .flatten()
                    .filter(|part| !part.trim().is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        if name.is_empty() {
            self.email.clone()
        } else {
            name
        }
    }
}

/// A signed-in session: credentials plus the user they belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub credentials: Credentials,
    pub user: User,
}

impl Session {
    /// Whether this session grants dashboard access.
    pub fn is_valid(&self) -> bool {
        self.user.role.is_staff()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_role_gate() {
        assert!(Role::Admin.is_staff());
        assert!(Role::Staff.is_staff());
        assert!(!Role::Customer.is_staff());
    }

    #[test]
    fn test_user_parses_backend_shape() {
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "email": "admin@store.com",
            "role": "ADMIN",
            "profile": { "firstName": "Ana", "lastName": "Ruiz" }
        }))
        .unwrap();

        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.display_name(), "Ana Ruiz");
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let user: User = serde_json::from_value(json!({
            "id": "u2",
            "email": "staff@store.com",
            "role": "STAFF"
        }))
        .unwrap();

        assert_eq!(user.display_name(), "staff@store.com");
    }

    #[test]
    fn test_credentials_debug_masks_tokens() {
        let creds = Credentials::new("access-token-secret-value", "r1");
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("***"));
    }
}
