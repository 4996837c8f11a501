// handlers/mod.rs - one module per resource, re-exported for routing in lib.rs

pub mod coleta;
pub mod cores;
pub mod funcionarios;
pub mod producao;
pub mod protocol;
pub mod system;

use chrono::NaiveDate;

use crate::clock::parse_date;
use crate::error::ApiError;

/// Optional `YYYY-MM-DD` query or body value. Blank counts as absent.
pub(crate) fn optional_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => parse_date(value)
            .map(Some)
            .ok_or_else(|| ApiError::field_error(field, format!("Invalid date '{}', expected YYYY-MM-DD", value))),
    }
}
