// handlers/protected/students/delete.rs - DELETE /api/students/:id handler

use axum::{
    extract::{Path, State},
    Extension,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

pub async fn student_delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    state.repository.delete(&id).await?;
    tracing::debug!(subject = %user.subject, %id, "student deleted");
    Ok(ApiResponse::success(json!({})))
}
