//! Core Vitrine library (session, request pipeline, auth, storefront resources).

pub mod api;
pub mod auth;
pub mod config;
pub mod logging;
pub mod session;

pub use api::{ApiClient, ApiError, ApiErrorKind, ApiResult};
pub use auth::AuthService;
pub use session::{Credentials, Role, SessionStore, User};
