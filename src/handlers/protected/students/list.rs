// handlers/protected/students/list.rs - GET /api/students handler

use axum::extract::{RawQuery, State};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::PagedResponse;

/// Filtering, selection, sorting and pagination all come from the raw query
/// string, e.g. `?gpa[gte]=3.5&select=firstName,gpa&sort=-gpa&page=2&limit=5`.
pub async fn student_list(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<PagedResponse, ApiError> {
    let page = state.repository.list(query.as_deref()).await?;
    Ok(PagedResponse(page))
}
