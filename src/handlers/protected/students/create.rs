// handlers/protected/students/create.rs - POST /api/students handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde_json::Value;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::Student;

pub async fn student_create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Student> {
    let Json(body) = body?;
    let student = state.repository.create(body).await?;
    tracing::debug!(subject = %user.subject, id = %student.id, "student created");
    Ok(ApiResponse::created(student))
}
