// HTTP API Error Types
use std::collections::BTreeMap;

use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::AuthError;
use crate::database::{RepositoryError, StoreError};
use crate::filter::FilterError;
use crate::models::ValidationError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest { message: String, code: &'static str },
    ValidationError {
        message: String,
        field_errors: Option<BTreeMap<String, String>>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error; `stack` is only rendered outside production
    InternalServerError { message: String, stack: Option<String> },

    // 503 Service Unavailable
    ServiceUnavailable { message: String, stack: Option<String> },
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            ApiError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest { message, .. } => message,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError { message, .. } => message,
            ApiError::ServiceUnavailable { message, .. } => message,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { code, .. } => *code,
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError { .. } => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
        }
    }

    /// Internal detail for 5xx errors
    pub fn stack(&self) -> Option<&str> {
        match self {
            ApiError::InternalServerError { stack, .. } | ApiError::ServiceUnavailable { stack, .. } => {
                stack.as_deref()
            }
            _ => None,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self, include_stack: bool) -> Value {
        let mut response = json!({
            "success": false,
            "message": self.message(),
            "code": self.error_code()
        });

        if let ApiError::ValidationError { field_errors: Some(field_errors), .. } = self {
            response["field_errors"] = json!(field_errors);
        }
        if let Some(stack) = self.stack().filter(|_| include_stack) {
            response["stack"] = json!(stack);
        }

        response
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::BadRequest { message: message.into(), code }
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<BTreeMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    /// Logs `detail` and keeps it as the error's `stack`.
    pub fn internal_server_error(message: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        tracing::error!("{}", detail);
        ApiError::InternalServerError {
            message: message.into(),
            stack: Some(detail.to_string()),
        }
    }

    pub fn service_unavailable(message: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        tracing::error!("{}", detail);
        ApiError::ServiceUnavailable {
            message: message.into(),
            stack: Some(detail.to_string()),
        }
    }
}

/// Error body including `stack`, carried in the response extensions.
/// `middleware::expose_error_stack` swaps it in when the app is not in
/// production; otherwise the client sees the body without it.
#[derive(Debug, Clone)]
pub struct DetailedErrorBody(pub Value);

// Convert other error types to ApiError
impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        let code = match &err {
            FilterError::MalformedFilter(_) => "MALFORMED_FILTER",
            FilterError::UnknownField(_) => "UNKNOWN_FIELD",
            FilterError::InvalidValue { .. } => "INVALID_VALUE",
            FilterError::UnsupportedOperator { .. } => "UNSUPPORTED_OPERATOR",
        };
        ApiError::bad_request(code, err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation_error(err.message, Some(err.field_errors))
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::not_found(format!("Student not found with id of {}", id)),
            StoreError::Conflict { field } => {
                ApiError::conflict(format!("Duplicate field value entered for '{}'", field))
            }
            StoreError::Connection(msg) => {
                ApiError::service_unavailable("Database temporarily unavailable", msg)
            }
            StoreError::Query(msg) => {
                // Don't expose internal SQL errors to clients in production
                ApiError::internal_server_error("An error occurred while processing your request", msg)
            }
            StoreError::Sqlx(sqlx_err) => {
                ApiError::internal_server_error("Database error occurred", sqlx_err)
            }
            StoreError::Serialization(e) => {
                ApiError::internal_server_error("Failed to format response", e)
            }
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Filter(e) => e.into(),
            RepositoryError::Validation(e) => e.into(),
            RepositoryError::NotFound(id) => {
                ApiError::not_found(format!("Student not found with id of {}", id))
            }
            RepositoryError::Store(e) => e.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::unauthorized(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_json(rejection.body_text())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let mut response = (self.status_code(), Json(self.to_json(false))).into_response();
        if self.stack().is_some() {
            response
                .extensions_mut()
                .insert(DetailedErrorBody(self.to_json(true)));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_errors_are_bad_requests_with_codes() {
        let err: ApiError = FilterError::UnknownField("password".into()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_json(false)["code"], "UNKNOWN_FIELD");
        assert_eq!(err.to_json(false)["success"], false);
    }

    #[test]
    fn validation_errors_carry_field_errors() {
        let err: ApiError = ValidationError::single("email", "Please add a valid email").into();
        let body = err.to_json(false);
        assert_eq!(body["field_errors"]["email"], "Please add a valid email");
        assert_eq!(body["message"], "Please add a valid email");
    }

    #[test]
    fn repository_errors_map_to_status_codes() {
        let not_found: ApiError = RepositoryError::NotFound("abc".into()).into();
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.message(), "Student not found with id of abc");

        let conflict: ApiError =
            RepositoryError::Store(StoreError::Conflict { field: "email".into() }).into();
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn internal_errors_keep_stack_out_of_the_default_body() {
        let err: ApiError = StoreError::Query("relation missing".into()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.stack(), Some("relation missing"));

        let public = err.to_json(false);
        assert!(public.get("stack").is_none());
        assert_ne!(public["message"], "relation missing");
        assert_eq!(err.to_json(true)["stack"], "relation missing");

        let response = err.into_response();
        let detailed = response.extensions().get::<DetailedErrorBody>().unwrap();
        assert_eq!(detailed.0["stack"], "relation missing");
    }

    #[test]
    fn client_errors_carry_no_detail() {
        let response = ApiError::not_found("gone").into_response();
        assert!(response.extensions().get::<DetailedErrorBody>().is_none());
    }
}
