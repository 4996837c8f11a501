use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use crate::clock::{LocalClock, DATE_FORMAT, TIME_FORMAT};

/// Column list shared by every query that loads a full entry row.
pub const ENTRY_COLUMNS: &str = "id, date_iso, time_hhmmss, code, service, uf, peso, nf, \
     carrier_value, customer_value, order_ref, registered_by, active, deleted_at, \
     protocol_id, printed_at, printed_by, created_at, updated_at";

/// One parcel in the collection log, as stored.
#[derive(Debug, Clone, FromRow)]
pub struct CollectionEntry {
    pub id: i64,
    pub date_iso: NaiveDate,
    pub time_hhmmss: NaiveTime,
    pub code: String,
    pub service: Option<String>,
    pub uf: Option<String>,
    pub peso: Option<String>,
    pub nf: Option<String>,
    pub carrier_value: Option<Decimal>,
    pub customer_value: Option<Decimal>,
    pub order_ref: Option<String>,
    pub registered_by: Option<String>,
    pub active: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub protocol_id: Option<String>,
    pub printed_at: Option<DateTime<Utc>>,
    pub printed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Wire shape of an entry. Keeps the field names the front end reads.
#[derive(Debug, Clone, Serialize)]
pub struct EntryView {
    pub id: i64,
    #[serde(rename = "dateISO")]
    pub date_iso: String,
    #[serde(rename = "timeHHMMSS")]
    pub time: String,
    pub code: String,
    pub service: Option<String>,
    pub uf: Option<String>,
    pub peso: Option<String>,
    pub nf: Option<String>,
    #[serde(rename = "valorCorreios", with = "rust_decimal::serde::float_option")]
    pub carrier_value: Option<Decimal>,
    #[serde(rename = "valorCliente", with = "rust_decimal::serde::float_option")]
    pub customer_value: Option<Decimal>,
    pub pedido: Option<String>,
    #[serde(rename = "registradoPor")]
    pub registered_by: Option<String>,
    pub active: bool,
    pub deleted_at: Option<String>,
    #[serde(rename = "protocolo_num")]
    pub protocol_id: Option<String>,
    pub printed_at: Option<String>,
    pub printed_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl EntryView {
    pub fn render(entry: CollectionEntry, clock: &LocalClock) -> Self {
        Self {
            id: entry.id,
            date_iso: entry.date_iso.format(DATE_FORMAT).to_string(),
            time: entry.time_hhmmss.format(TIME_FORMAT).to_string(),
            code: entry.code,
            service: entry.service,
            uf: entry.uf,
            peso: entry.peso,
            nf: entry.nf,
            carrier_value: entry.carrier_value,
            customer_value: entry.customer_value,
            pedido: entry.order_ref,
            registered_by: entry.registered_by,
            active: entry.active,
            deleted_at: clock.format_opt(entry.deleted_at),
            protocol_id: entry.protocol_id,
            printed_at: clock.format_opt(entry.printed_at),
            printed_by: entry.printed_by,
            created_at: clock.format_timestamp(entry.created_at),
            updated_at: clock.format_timestamp(entry.updated_at),
        }
    }
}

/// Normalized submission, ready to be merged into storage.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub date_iso: NaiveDate,
    pub time_hhmmss: NaiveTime,
    /// False when the time was filled with "now"; such a time never
    /// replaces the one already stored.
    pub time_given: bool,
    pub code: String,
    pub service: Option<String>,
    pub uf: Option<String>,
    pub peso: Option<String>,
    pub nf: Option<String>,
    pub carrier_value: Option<Decimal>,
    pub customer_value: Option<Decimal>,
    pub order_ref: Option<String>,
    pub registered_by: Option<String>,
}

/// Minimal projection printed on the physical receipt.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReceiptLine {
    pub code: String,
    #[serde(rename = "pedido")]
    pub order_ref: Option<String>,
}

/// Entry as shown when re-querying one protocol.
#[derive(Debug, Clone, FromRow)]
pub struct ProtocolItemRow {
    pub code: String,
    pub time_hhmmss: NaiveTime,
    pub service: Option<String>,
    pub uf: Option<String>,
    pub nf: Option<String>,
    pub order_ref: Option<String>,
    pub customer_value: Option<Decimal>,
    pub carrier_value: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProtocolItem {
    pub code: String,
    #[serde(rename = "timeHHMMSS")]
    pub time: String,
    pub service: Option<String>,
    pub uf: Option<String>,
    pub nf: Option<String>,
    pub pedido: Option<String>,
    #[serde(rename = "valorCliente", with = "rust_decimal::serde::float_option")]
    pub customer_value: Option<Decimal>,
    #[serde(rename = "valorCorreios", with = "rust_decimal::serde::float_option")]
    pub carrier_value: Option<Decimal>,
}

impl From<ProtocolItemRow> for ProtocolItem {
    fn from(row: ProtocolItemRow) -> Self {
        Self {
            code: row.code,
            time: row.time_hhmmss.format(TIME_FORMAT).to_string(),
            service: row.service,
            uf: row.uf,
            nf: row.nf,
            pedido: row.order_ref,
            customer_value: row.customer_value,
            carrier_value: row.carrier_value,
        }
    }
}

/// One closed protocol, aggregated over its active entries.
#[derive(Debug, Clone, FromRow)]
pub struct ProtocolAggregateRow {
    pub protocol_id: String,
    pub printed_at: Option<DateTime<Utc>>,
    pub printed_by: String,
    pub qtd: i64,
    pub total_cliente: Decimal,
    pub total_correios: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProtocolSummary {
    #[serde(rename = "protocolo_num")]
    pub protocol_id: String,
    pub printed_at: Option<String>,
    pub printed_by: String,
    pub qtd: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_cliente: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_correios: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub lucro: Decimal,
}

impl ProtocolSummary {
    /// Profit is derived here rather than in SQL.
    pub fn render(row: ProtocolAggregateRow, clock: &LocalClock) -> Self {
        Self {
            lucro: row.total_cliente - row.total_correios,
            protocol_id: row.protocol_id,
            printed_at: clock.format_opt(row.printed_at),
            printed_by: row.printed_by,
            qtd: row.qtd,
            total_cliente: row.total_cliente,
            total_correios: row.total_correios,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    #[test]
    fn summary_profit_is_customer_minus_carrier() {
        let row = ProtocolAggregateRow {
            protocol_id: "PR-20250101-001".into(),
            printed_at: Some(Utc.with_ymd_and_hms(2025, 1, 1, 21, 0, 0).unwrap()),
            printed_by: "Ana".into(),
            qtd: 3,
            total_cliente: Decimal::from_str("150.30").unwrap(),
            total_correios: Decimal::from_str("98.75").unwrap(),
        };
        let summary = ProtocolSummary::render(row, &LocalClock::default());
        assert_eq!(summary.lucro, Decimal::from_str("51.55").unwrap());
        assert_eq!(summary.printed_at.as_deref(), Some("2025-01-01 18:00:00"));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["protocolo_num"], "PR-20250101-001");
        let lucro = json["lucro"].as_f64().unwrap();
        assert!((lucro - 51.55).abs() < 1e-9, "lucro={}", lucro);
    }

    #[test]
    fn entry_view_uses_wire_field_names() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let entry = CollectionEntry {
            id: 7,
            date_iso: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            time_hhmmss: NaiveTime::from_hms_opt(9, 5, 0).unwrap(),
            code: "AB12".into(),
            service: Some("SEDEX".into()),
            uf: None,
            peso: None,
            nf: None,
            carrier_value: Some(Decimal::from_str("12.50").unwrap()),
            customer_value: None,
            order_ref: Some("123".into()),
            registered_by: None,
            active: true,
            deleted_at: None,
            protocol_id: None,
            printed_at: None,
            printed_by: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(EntryView::render(entry, &LocalClock::default())).unwrap();
        assert_eq!(json["dateISO"], "2025-01-01");
        assert_eq!(json["timeHHMMSS"], "09:05:00");
        assert_eq!(json["valorCorreios"].as_f64(), Some(12.5));
        assert!(json["valorCliente"].is_null());
        assert_eq!(json["pedido"], "123");
        assert!(json["deleted_at"].is_null());
    }
}
