// handlers/protocol.rs - day closing, history and protocol reprint

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{CloseDayResult, HistoryResult};
use crate::state::AppState;

use super::optional_date;

#[derive(Debug, Default, Deserialize)]
pub struct CloseDayRequest {
    pub date: Option<String>,
    pub printed_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// POST /api/coleta/fechar-dia (alias /api/coleta/print). A request without
/// a JSON body closes today; a body that is present must be well formed.
/// Without `printed_by` the token subject signs the receipt.
pub async fn close_day(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
    body: Result<Json<CloseDayRequest>, JsonRejection>,
) -> ApiResult<CloseDayResult> {
    let request = close_day_request(body)?;
    let date = optional_date("date", request.date.as_deref())?;

    let printed_by = request
        .printed_by
        .filter(|s| !s.trim().is_empty())
        .or_else(|| user.map(|Extension(u)| u.subject));

    let result = state.protocols().close_day(date, printed_by).await?;
    Ok(ApiResponse::success(result))
}

/// Only a body sent without a JSON content type falls back to defaults.
fn close_day_request(body: Result<Json<CloseDayRequest>, JsonRejection>) -> Result<CloseDayRequest, ApiError> {
    match body {
        Ok(Json(request)) => Ok(request),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(CloseDayRequest::default()),
        Err(rejection) => Err(rejection.into()),
    }
}

/// GET /api/coleta/historico (alias /api/coleta/protocolos)
pub async fn history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<HistoryResult> {
    let Query(query) = query?;
    let from = optional_date("from", query.from.as_deref())?;
    let to = optional_date("to", query.to.as_deref())?;

    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(ApiError::field_error("from", "Must not be after 'to'"));
        }
    }

    let result = state
        .protocols()
        .history(from, to, state.config.coleta.history_default_days)
        .await?;
    Ok(ApiResponse::success(result))
}

/// GET /api/coleta/protocolo/:id
pub async fn protocol_entries(
    State(state): State<AppState>,
    Path(protocol_id): Path<String>,
) -> ApiResult<Value> {
    let rows = state.protocols().protocol_entries(protocol_id.trim()).await?;
    Ok(ApiResponse::success(json!({
        "protocolo": protocol_id.trim(),
        "rows": rows
    })))
}
