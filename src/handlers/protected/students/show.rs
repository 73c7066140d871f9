// handlers/protected/students/show.rs - GET /api/students/:id handler

use axum::extract::{Path, State};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::Student;

pub async fn student_show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Student> {
    let student = state.repository.get(&id).await?;
    Ok(ApiResponse::success(student))
}
