use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shown when the backend did not provide a usable message.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Categories of API errors for consistent error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// Network unreachable, connection reset, DNS failure
    Transport,
    /// Connection or request timeout
    Timeout,
    /// Non-2xx HTTP status
    HttpStatus,
    /// 2xx response whose envelope carried `error: true`
    Backend,
    /// Response body could not be decoded into the expected shape
    Parse,
    /// Token refresh exchange failed (missing token, rejected, unreachable)
    RefreshFailed,
    /// Refresh failed while recovering a 401; the session was torn down
    SessionExpired,
    /// Valid credentials, but the account may not use the dashboard
    AccessDenied,
    /// Local session storage failed
    Storage,
    /// Caller input that cannot form a valid request
    InvalidInput,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApiErrorKind::Transport => "transport",
            ApiErrorKind::Timeout => "timeout",
            ApiErrorKind::HttpStatus => "http_status",
            ApiErrorKind::Backend => "backend",
            ApiErrorKind::Parse => "parse",
            ApiErrorKind::RefreshFailed => "refresh_failed",
            ApiErrorKind::SessionExpired => "session_expired",
            ApiErrorKind::AccessDenied => "access_denied",
            ApiErrorKind::Storage => "storage",
            ApiErrorKind::InvalidInput => "invalid_input",
        };
        f.write_str(name)
    }
}

/// Structured error surfaced by every backend call.
///
/// `Clone` so one refresh outcome can be handed to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    /// HTTP status, when the backend answered
    pub status: Option<u16>,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
    /// Whether `message` came from the backend itself
    backend_message: bool,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            details: None,
            backend_message: false,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Maps a reqwest failure to `Timeout` or `Transport`.
    pub fn transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ApiErrorKind::Timeout, "Request timed out")
        } else {
            Self::new(ApiErrorKind::Transport, "Could not reach the server")
                .with_details(err.to_string())
        }
    }

    /// Creates an HTTP status error, lifting the backend's `message` when the
    /// body carries one.
    pub fn http_status(status: u16, body: &str) -> Self {
        let mut err = match backend_message(body) {
            Some(msg) => Self::new(ApiErrorKind::HttpStatus, msg).from_backend(),
            None => Self::new(ApiErrorKind::HttpStatus, format!("HTTP {status}")),
        };
        err.status = Some(status);
        if !body.is_empty() {
            err.details = Some(body.to_string());
        }
        err
    }

    /// Creates an error from an envelope with `error: true`.
    pub fn backend(status: u16, message: &str) -> Self {
        let mut err = if message.trim().is_empty() {
            Self::new(ApiErrorKind::Backend, format!("HTTP {status}"))
        } else {
            Self::new(ApiErrorKind::Backend, message.trim()).from_backend()
        };
        err.status = Some(status);
        err
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Parse, message)
    }

    pub fn refresh_failed(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::RefreshFailed, message)
    }

    /// Wraps the refresh failure that ended the session.
    pub fn session_expired(cause: &ApiError) -> Self {
        let mut err = Self::new(
            ApiErrorKind::SessionExpired,
            "Your session has expired. Please sign in again.",
        )
        .with_details(cause.to_string());
        err.status = cause.status;
        err
    }

    pub fn access_denied() -> Self {
        Self::new(
            ApiErrorKind::AccessDenied,
            "Access denied. Only administrators and staff can use the dashboard.",
        )
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InvalidInput, message)
    }

    pub fn storage(err: &anyhow::Error) -> Self {
        Self::new(ApiErrorKind::Storage, format!("{err:#}"))
    }

    /// True when the error came from a 401 response.
    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }

    /// Whether the user has to sign in again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self.kind,
            ApiErrorKind::SessionExpired | ApiErrorKind::RefreshFailed
        )
    }

    /// Message to show a person: the backend's own words when it sent any,
    /// otherwise a generic fallback. Locally-raised errors keep their message.
    pub fn user_message(&self) -> &str {
        match self.kind {
            ApiErrorKind::HttpStatus | ApiErrorKind::Backend | ApiErrorKind::Parse
                if !self.backend_message =>
            {
                GENERIC_ERROR_MESSAGE
            }
            _ => &self.message,
        }
    }

    fn from_backend(mut self) -> Self {
        self.backend_message = true;
        self
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Extracts `message` from a JSON error body.
fn backend_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    json.get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|msg| !msg.is_empty())
        .map(ToString::to_string)
}
