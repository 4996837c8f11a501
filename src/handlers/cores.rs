// handlers/cores.rs - color word mapping

use axum::extract::{rejection::JsonRejection, State};
use axum::Json;
use serde::Deserialize;

use crate::database::models::ColorMapping;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateColorRequest {
    #[serde(default)]
    pub palavra: String,
    #[serde(default)]
    pub grupo_cor: String,
}

/// GET /cores
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<ColorMapping>> {
    Ok(ApiResponse::success(state.colors().list().await?))
}

/// POST /cores
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<CreateColorRequest>, JsonRejection>,
) -> ApiResult<ColorMapping> {
    let Json(request) = body?;
    let mapping = state
        .colors()
        .create(&request.palavra, &request.grupo_cor)
        .await?;
    Ok(ApiResponse::created(mapping))
}
