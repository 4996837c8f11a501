// handlers/producao.rs - production pipeline CRUD and product import list

use axum::extract::{
    rejection::{JsonRejection, PathRejection},
    Path, State,
};
use axum::Json;
use serde_json::{json, Value};

use crate::database::models::{NewProduction, ProductKey, ProductionChanges, ProductionView};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /producoes
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<ProductionView>> {
    Ok(ApiResponse::success(state.productions().list().await?))
}

/// POST /producoes
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<NewProduction>, JsonRejection>,
) -> ApiResult<ProductionView> {
    let Json(input) = body?;
    let created = state.productions().create(input).await?;
    Ok(ApiResponse::created(created))
}

/// PUT /producoes/:id
pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<ProductionChanges>, JsonRejection>,
) -> ApiResult<ProductionView> {
    let Path(id) = id?;
    let Json(changes) = body?;
    let updated = state.productions().update(id, changes).await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /producoes/:id
pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Value> {
    let Path(id) = id?;
    state.productions().delete(id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

/// GET /importar-produtos
pub async fn import_products(State(state): State<AppState>) -> ApiResult<Vec<ProductKey>> {
    Ok(ApiResponse::success(state.productions().distinct_products().await?))
}
