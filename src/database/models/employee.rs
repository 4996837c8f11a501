use serde::Serialize;
use sqlx::FromRow;

/// Operator who registers entries and closes protocols.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub is_default: bool,
}
