// handlers/coleta.rs - collection entries: list, upsert, soft delete, restore

use axum::extract::{
    rejection::{JsonRejection, PathRejection, QueryRejection},
    Path, Query, State,
};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{ListFilter, UpsertSummary};
use crate::state::AppState;

use super::optional_date;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    /// `"1"` includes soft-deleted entries.
    pub include_deleted: Option<String>,
}

impl ListQuery {
    fn into_filter(self) -> Result<ListFilter, crate::error::ApiError> {
        Ok(ListFilter {
            from: optional_date("from", self.from.as_deref())?,
            to: optional_date("to", self.to.as_deref())?,
            include_deleted: self.include_deleted.as_deref().map(str::trim) == Some("1"),
        })
    }
}

/// GET /api/coleta
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Value> {
    let Query(query) = query?;
    let filter = query.into_filter()?;

    let rows = state
        .entries()
        .list(&filter, state.config.coleta.list_default_days)
        .await?;
    Ok(ApiResponse::success(json!({ "rows": rows })))
}

/// POST /api/coleta - accepts one entry object or a list of them
pub async fn upsert(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<UpsertSummary> {
    let Json(payload) = payload?;
    let summary = state.entries().upsert(payload).await?;
    Ok(ApiResponse::success(summary))
}

/// DELETE /api/coleta/:id
pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Value> {
    let Path(id) = id?;
    let mode = state.entries().soft_delete(id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "mode": mode })))
}

/// POST /api/coleta/:id/restore
pub async fn restore(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Value> {
    let Path(id) = id?;
    let entry = state.entries().restore(id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "row": entry })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_deleted_only_on_one() {
        let query = ListQuery {
            include_deleted: Some("1".into()),
            ..Default::default()
        };
        assert!(query.into_filter().unwrap().include_deleted);

        for raw in ["0", "true", ""] {
            let query = ListQuery {
                include_deleted: Some(raw.into()),
                ..Default::default()
            };
            assert!(!query.into_filter().unwrap().include_deleted, "{raw}");
        }
    }

    #[test]
    fn rejects_malformed_bounds() {
        let query = ListQuery {
            from: Some("2025-13-01".into()),
            ..Default::default()
        };
        assert!(query.into_filter().is_err());
    }
}
