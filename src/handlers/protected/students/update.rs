// handlers/protected/students/update.rs - PUT /api/students/:id handler

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::Value;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::Student;

/// Partial bodies are merged over the stored record before validation.
/// The record is looked up before the body is read, so a missing id is 404
/// whatever the body holds.
pub async fn student_update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Student> {
    let current = state.repository.get(&id).await?;
    let Json(body) = body?;
    let student = state.repository.apply_update(current, body).await?;
    tracing::debug!(subject = %user.subject, id = %student.id, "student updated");
    Ok(ApiResponse::success(student))
}
