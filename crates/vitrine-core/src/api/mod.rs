//! Backend API: request pipeline, token refresh, and storefront resources.

mod error;
mod pipeline;
mod products;
mod refresh;
mod request;
mod uploads;
mod users;

pub use error::{ApiError, ApiErrorKind, ApiResult, GENERIC_ERROR_MESSAGE};
pub use pipeline::{ApiClient, RawResponse, USER_AGENT, attach_auth, unwrap_envelope};
pub use products::{Category, Product, ProductInput, ProductQuery};
pub use refresh::{REFRESH_PATH, RefreshCoordinator, RefreshState};
pub use request::{ApiRequest, RequestBody, UploadFile, resource_path};
pub use uploads::image_mime_type;
pub use users::{AuthSession, UserQuery};
