//! Input normalization for collection entry submissions.
//!
//! Submissions arrive from a browser form, so every field is optional and
//! loosely typed: money comes as `"1.234,56"` or as a JSON number, order
//! references carry prefixes like `#PED-123`, codes carry stray spaces.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::clock::{parse_date, parse_time, LocalClock};
use crate::database::models::NewEntry;

use super::ServiceError;

/// Raw submission as posted to `/api/coleta`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntrySubmission {
    #[serde(rename = "dateISO", default)]
    pub date_iso: Option<String>,
    #[serde(alias = "timeHHMMSS", default)]
    pub time: Option<String>,
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub service: Option<Value>,
    #[serde(default)]
    pub uf: Option<Value>,
    #[serde(default)]
    pub peso: Option<Value>,
    #[serde(default)]
    pub nf: Option<Value>,
    #[serde(rename = "valorCorreios", default)]
    pub valor_correios: Option<Value>,
    #[serde(rename = "valorCliente", default)]
    pub valor_cliente: Option<Value>,
    #[serde(default)]
    pub pedido: Option<Value>,
    #[serde(rename = "registradoPor", default)]
    pub registrado_por: Option<Value>,
}

/// Result of normalizing a whole batch.
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub entries: Vec<NewEntry>,
    /// Submissions discarded because their code was empty.
    pub dropped: usize,
}

/// Split a request body into submissions. Accepts one object or an array.
pub fn submissions_from_json(payload: Value) -> Result<Vec<EntrySubmission>, ServiceError> {
    let items = match payload {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        _ => {
            return Err(ServiceError::validation(
                "Expected an entry object or a list of entries",
            ))
        }
    };

    let mut field_errors = HashMap::new();
    let mut submissions = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<EntrySubmission>(item) {
            Ok(sub) => submissions.push(sub),
            Err(e) => {
                field_errors.insert(format!("[{}]", idx), e.to_string());
            }
        }
    }

    if !field_errors.is_empty() {
        return Err(ServiceError::Validation {
            message: "Malformed entries in batch".to_string(),
            field_errors,
        });
    }
    Ok(submissions)
}

/// Normalize every submission; empty codes are dropped, bad dates or
/// times reject the batch with per-item field errors.
pub fn normalize_batch(
    submissions: Vec<EntrySubmission>,
    clock: &LocalClock,
) -> Result<NormalizedBatch, ServiceError> {
    let mut batch = NormalizedBatch::default();
    let mut field_errors = HashMap::new();

    for (idx, sub) in submissions.into_iter().enumerate() {
        match normalize_submission(sub, clock) {
            Ok(Some(entry)) => batch.entries.push(entry),
            Ok(None) => batch.dropped += 1,
            Err((field, message)) => {
                field_errors.insert(format!("[{}].{}", idx, field), message);
            }
        }
    }

    if !field_errors.is_empty() {
        return Err(ServiceError::Validation {
            message: "Invalid entries in batch".to_string(),
            field_errors,
        });
    }
    Ok(batch)
}

/// `Ok(None)` means the submission has no usable code and is skipped.
pub fn normalize_submission(
    sub: EntrySubmission,
    clock: &LocalClock,
) -> Result<Option<NewEntry>, (&'static str, String)> {
    let code = match normalize_code(sub.code.as_ref()) {
        Some(code) => code,
        None => return Ok(None),
    };

    let date_iso = match blank_to_none(sub.date_iso.as_deref()) {
        Some(raw) => parse_date(raw)
            .ok_or_else(|| ("dateISO", format!("Invalid date '{}', expected YYYY-MM-DD", raw)))?,
        None => clock.today(),
    };

    let (time_hhmmss, time_given) = match blank_to_none(sub.time.as_deref()) {
        Some(raw) => {
            let time = parse_time(raw)
                .ok_or_else(|| ("time", format!("Invalid time '{}', expected HH:MM:SS", raw)))?;
            (time, true)
        }
        None => (clock.now_time(), false),
    };

    Ok(Some(NewEntry {
        date_iso,
        time_hhmmss,
        time_given,
        code,
        service: text(sub.service.as_ref()),
        uf: text(sub.uf.as_ref()),
        peso: text(sub.peso.as_ref()),
        nf: text(sub.nf.as_ref()),
        carrier_value: parse_money(sub.valor_correios.as_ref()),
        customer_value: parse_money(sub.valor_cliente.as_ref()),
        order_ref: only_digits(sub.pedido.as_ref()),
        registered_by: text(sub.registrado_por.as_ref()),
    }))
}

/// Trimmed, upper-cased carrier code; `None` when nothing is left.
pub fn normalize_code(raw: Option<&Value>) -> Option<String> {
    text(raw).map(|s| s.to_uppercase())
}

/// Parse a pt-BR formatted amount (`.` thousands, `,` decimals) or a JSON
/// number. Empty or unparsable input is absent, never zero.
pub fn parse_money(raw: Option<&Value>) -> Option<Decimal> {
    match raw? {
        Value::String(s) => {
            let cleaned = s.trim().replace('.', "").replace(',', ".");
            if cleaned.is_empty() {
                return None;
            }
            Decimal::from_str(&cleaned).ok()
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else {
                n.as_f64().and_then(Decimal::from_f64)
            }
        }
        _ => None,
    }
}

/// Concatenation of every digit in the value; `None` when there are none.
pub fn only_digits(raw: Option<&Value>) -> Option<String> {
    let source = match raw? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let digits: String = source.chars().filter(|c| c.is_ascii_digit()).collect();
    (!digits.is_empty()).then_some(digits)
}

fn text(raw: Option<&Value>) -> Option<String> {
    match raw? {
        Value::String(s) => blank_to_none(Some(s.as_str())).map(str::to_string),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn blank_to_none(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use serde_json::json;

    fn money(v: Value) -> Option<Decimal> {
        parse_money(Some(&v))
    }

    #[test]
    fn parses_locale_formatted_money() {
        assert_eq!(money(json!("1.234,56")), Some(Decimal::from_str("1234.56").unwrap()));
        assert_eq!(money(json!(" 12,5 ")), Some(Decimal::from_str("12.5").unwrap()));
        assert_eq!(money(json!(30)), Some(Decimal::from(30)));
        assert_eq!(money(json!(19.9)), Some(Decimal::from_str("19.9").unwrap()));
        assert_eq!(money(json!("")), None);
        assert_eq!(money(json!("abc")), None);
        assert_eq!(money(Value::Null), None);
        assert_eq!(parse_money(None), None);
    }

    #[test]
    fn trims_and_uppercases_codes() {
        assert_eq!(normalize_code(Some(&json!(" ab12 "))), Some("AB12".to_string()));
        assert_eq!(normalize_code(Some(&json!("   "))), None);
        assert_eq!(normalize_code(None), None);
    }

    #[test]
    fn keeps_only_digits_of_order_reference() {
        assert_eq!(only_digits(Some(&json!("#PED-12 34"))), Some("1234".to_string()));
        assert_eq!(only_digits(Some(&json!(987))), Some("987".to_string()));
        assert_eq!(only_digits(Some(&json!("sem pedido"))), None);
        assert_eq!(only_digits(None), None);
    }

    #[test]
    fn fills_date_and_time_when_absent() {
        let clock = LocalClock::default();
        let sub = EntrySubmission {
            code: Some(json!("qb123")),
            service: Some(json!("")),
            ..Default::default()
        };
        let entry = normalize_submission(sub, &clock).unwrap().unwrap();
        assert_eq!(entry.code, "QB123");
        assert_eq!(entry.service, None);
        assert!(!entry.time_given);
        // today may roll over between the two reads only at midnight
        assert!(entry.date_iso >= clock.today() - chrono::Duration::days(1));
    }

    #[test]
    fn keeps_explicit_date_and_time() {
        let sub: EntrySubmission = serde_json::from_value(json!({
            "dateISO": "2025-01-01",
            "timeHHMMSS": "10:20:30",
            "code": "x1",
            "valorCliente": "25,00",
            "pedido": "A-77",
            "registradoPor": "Ana"
        }))
        .unwrap();
        let entry = normalize_submission(sub, &LocalClock::default()).unwrap().unwrap();
        assert_eq!(entry.date_iso, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(entry.time_hhmmss, NaiveTime::from_hms_opt(10, 20, 30).unwrap());
        assert!(entry.time_given);
        assert_eq!(entry.customer_value, Some(Decimal::from_str("25.00").unwrap()));
        assert_eq!(entry.order_ref.as_deref(), Some("77"));
        assert_eq!(entry.registered_by.as_deref(), Some("Ana"));
        assert_eq!(entry.carrier_value, None);
    }

    #[test]
    fn drops_items_without_code_but_keeps_the_rest() {
        let subs = submissions_from_json(json!([
            { "code": " ab12 " },
            { "code": "   " },
            { "service": "PAC" },
            { "code": "cd34" }
        ]))
        .unwrap();
        let batch = normalize_batch(subs, &LocalClock::default()).unwrap();
        assert_eq!(batch.dropped, 2);
        let codes: Vec<_> = batch.entries.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["AB12", "CD34"]);
    }

    #[test]
    fn rejects_invalid_dates_with_field_errors() {
        let subs = submissions_from_json(json!([
            { "code": "ok1", "dateISO": "2025-01-01" },
            { "code": "bad", "dateISO": "31/12/2025" }
        ]))
        .unwrap();
        match normalize_batch(subs, &LocalClock::default()) {
            Err(ServiceError::Validation { field_errors, .. }) => {
                assert!(field_errors.contains_key("[1].dateISO"));
                assert_eq!(field_errors.len(), 1);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn accepts_single_object_and_rejects_scalars() {
        assert_eq!(submissions_from_json(json!({ "code": "A" })).unwrap().len(), 1);
        assert!(submissions_from_json(json!("A")).is_err());
        assert!(submissions_from_json(json!([{ "dateISO": 5 }])).is_err());
    }
}
