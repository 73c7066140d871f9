use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::CONTENT_LENGTH, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::StudentPage;
use crate::error::DetailedErrorBody;

/// Wrapper for API responses that automatically adds success envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: None,
        }
    }

    /// Create a 201 Created response
    pub fn created(data: T) -> Self {
        Self {
            data,
            status_code: Some(StatusCode::CREATED),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);
        match serde_json::to_value(&self.data) {
            Ok(data) => (status, Json(json!({ "success": true, "data": data }))).into_response(),
            Err(e) => serialization_failure(e),
        }
    }
}

/// `{success, count, pagination, data}` for list routes.
#[derive(Debug)]
pub struct PagedResponse(pub StudentPage);

impl IntoResponse for PagedResponse {
    fn into_response(self) -> Response {
        match serde_json::to_value(&self.0) {
            Ok(Value::Object(mut body)) => {
                body.insert("success".to_string(), Value::Bool(true));
                (StatusCode::OK, Json(Value::Object(body))).into_response()
            }
            Ok(_) => serialization_failure("page did not serialize to an object"),
            Err(e) => serialization_failure(e),
        }
    }
}

fn serialization_failure(e: impl std::fmt::Display) -> Response {
    tracing::error!("Failed to serialize response data: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "message": "Failed to serialize response data",
            "code": "INTERNAL_SERVER_ERROR"
        })),
    )
        .into_response()
}

/// Renders `stack` on 5xx bodies unless the app runs in production.
pub async fn expose_error_stack(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let Some(DetailedErrorBody(detailed)) = response.extensions_mut().remove::<DetailedErrorBody>()
    else {
        return response;
    };
    if state.config.is_production() {
        return response;
    }

    match serde_json::to_vec(&detailed) {
        Ok(bytes) => {
            let (mut parts, _) = response.into_parts();
            parts.headers.remove(CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(e) => {
            tracing::warn!("Failed to render error detail: {}", e);
            response
        }
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
