// handlers/funcionarios.rs - operators and the default operator flag

use axum::extract::{
    rejection::{JsonRejection, PathRejection},
    Path, State,
};
use axum::Json;
use serde::Deserialize;

use crate::database::models::Employee;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateEmployeeRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

/// GET /api/funcionarios
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Employee>> {
    Ok(ApiResponse::success(state.employees().list().await?))
}

/// POST /api/funcionarios
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<CreateEmployeeRequest>, JsonRejection>,
) -> ApiResult<Employee> {
    let Json(request) = body?;
    let employee = state
        .employees()
        .create(&request.name, request.is_default)
        .await?;
    Ok(ApiResponse::created(employee))
}

/// POST /api/funcionarios/:id/default
pub async fn set_default(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Employee> {
    let Path(id) = id?;
    Ok(ApiResponse::success(state.employees().set_default(id).await?))
}
