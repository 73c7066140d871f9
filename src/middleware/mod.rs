pub mod auth;
pub mod response;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use response::{expose_error_stack, ApiResponse, ApiResult, PagedResponse};
