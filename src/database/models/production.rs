use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::clock::LocalClock;

/// Pipeline stage of a manufacturing item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionStatus {
    OnDemand,
    Fila,
    Construcao,
    Finalizado,
}

impl ProductionStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "on_demand" => Some(Self::OnDemand),
            "fila" => Some(Self::Fila),
            "construcao" => Some(Self::Construcao),
            "finalizado" => Some(Self::Finalizado),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnDemand => "on_demand",
            Self::Fila => "fila",
            Self::Construcao => "construcao",
            Self::Finalizado => "finalizado",
        }
    }

    /// Column stamped when an item enters this stage.
    pub fn timestamp_column(&self) -> &'static str {
        match self {
            Self::OnDemand => "data_on_demand",
            Self::Fila => "data_fila",
            Self::Construcao => "data_construcao",
            Self::Finalizado => "data_finalizado",
        }
    }
}

pub const PRODUCTION_COLUMNS: &str = "id, produto, tamanho, erp_id, status, quantidade, origem, \
     observacao, desativado, criado_em, data_on_demand, data_fila, data_construcao, data_finalizado";

#[derive(Debug, Clone, FromRow)]
pub struct Production {
    pub id: i64,
    pub produto: Option<String>,
    pub tamanho: Option<String>,
    pub erp_id: Option<String>,
    pub status: Option<String>,
    pub quantidade: i32,
    pub origem: Option<String>,
    pub observacao: Option<String>,
    pub desativado: bool,
    pub criado_em: DateTime<Utc>,
    pub data_on_demand: Option<DateTime<Utc>>,
    pub data_fila: Option<DateTime<Utc>>,
    pub data_construcao: Option<DateTime<Utc>>,
    pub data_finalizado: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductionView {
    pub id: i64,
    pub produto: Option<String>,
    pub tamanho: Option<String>,
    pub erp_id: Option<String>,
    pub status: Option<String>,
    pub quantidade: i32,
    pub origem: Option<String>,
    pub observacao: Option<String>,
    pub desativado: bool,
    pub criado_em: String,
    pub data_on_demand: Option<String>,
    pub data_fila: Option<String>,
    pub data_construcao: Option<String>,
    pub data_finalizado: Option<String>,
}

impl ProductionView {
    pub fn render(row: Production, clock: &LocalClock) -> Self {
        Self {
            id: row.id,
            produto: row.produto,
            tamanho: row.tamanho,
            erp_id: row.erp_id,
            status: row.status,
            quantidade: row.quantidade,
            origem: row.origem,
            observacao: row.observacao,
            desativado: row.desativado,
            criado_em: clock.format_timestamp(row.criado_em),
            data_on_demand: clock.format_opt(row.data_on_demand),
            data_fila: clock.format_opt(row.data_fila),
            data_construcao: clock.format_opt(row.data_construcao),
            data_finalizado: clock.format_opt(row.data_finalizado),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduction {
    pub produto: Option<String>,
    pub tamanho: Option<String>,
    pub erp_id: Option<String>,
    pub status: Option<String>,
    pub quantidade: Option<i32>,
    pub origem: Option<String>,
}

/// Partial update; only present keys are written.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductionChanges {
    pub status: Option<String>,
    pub quantidade: Option<i32>,
    pub desativado: Option<bool>,
    pub observacao: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductKey {
    pub produto: String,
    pub tamanho: String,
    pub erp_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_maps_to_its_timestamp_column() {
        for raw in ["on_demand", "fila", "construcao", "finalizado"] {
            let status = ProductionStatus::parse(raw).unwrap();
            assert_eq!(status.as_str(), raw);
            assert_eq!(status.timestamp_column(), format!("data_{}", raw));
        }
        assert_eq!(ProductionStatus::parse("enviado"), None);
    }
}
