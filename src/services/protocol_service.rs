use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};

use crate::clock::LocalClock;
use crate::database::models::{
    ProtocolAggregateRow, ProtocolItem, ProtocolItemRow, ProtocolSummary, ReceiptLine,
};

use super::ServiceError;

/// First key of the two-int advisory lock taken while closing a day. The
/// second key is the date, so closings of different days never wait on
/// each other.
const CLOSE_DAY_LOCK_NAMESPACE: i32 = 0x434f_4c45;

const SEQUENCE_WIDTH: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct CloseDayResult {
    /// `None` when the day had nothing left to close.
    pub protocolo: Option<String>,
    pub date: NaiveDate,
    pub count: usize,
    pub rows: Vec<ReceiptLine>,
}

impl CloseDayResult {
    fn nothing_to_close(date: NaiveDate) -> Self {
        Self {
            protocolo: None,
            date,
            count: 0,
            rows: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResult {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub rows: Vec<ProtocolSummary>,
}

pub struct ProtocolService {
    pool: PgPool,
    clock: LocalClock,
    prefix: String,
}

impl ProtocolService {
    pub fn new(pool: PgPool, clock: LocalClock, prefix: impl Into<String>) -> Self {
        Self {
            pool,
            clock,
            prefix: prefix.into(),
        }
    }

    /// Stamp every open entry of `date` (default today) with the next
    /// protocol id and return what goes on the printed receipt.
    ///
    /// The id is read and written under a transaction-scoped advisory lock
    /// keyed by the date, so concurrent closings of the same day run one
    /// after the other and never share a sequence number. Any failure rolls
    /// the whole closing back.
    pub async fn close_day(
        &self,
        date: Option<NaiveDate>,
        printed_by: Option<String>,
    ) -> Result<CloseDayResult, ServiceError> {
        let date = date.unwrap_or_else(|| self.clock.today());
        let printed_by = printed_by
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(CLOSE_DAY_LOCK_NAMESPACE)
            .bind(date_lock_key(date))
            .execute(&mut *tx)
            .await?;

        let has_open: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM coleta_protocolos
                WHERE active AND date_iso = $1 AND protocol_id IS NULL
             )",
        )
        .bind(date)
        .fetch_one(&mut *tx)
        .await?;

        if !has_open {
            tx.commit().await?;
            debug!(%date, "No open entries to close");
            return Ok(CloseDayResult::nothing_to_close(date));
        }

        let protocol_id = self.next_protocol_id(&mut *tx, date).await?;

        let stamped = sqlx::query(
            "UPDATE coleta_protocolos
             SET protocol_id = $1,
                 printed_at = clock_timestamp(),
                 printed_by = $2,
                 updated_at = clock_timestamp()
             WHERE active AND date_iso = $3 AND protocol_id IS NULL",
        )
        .bind(&protocol_id)
        .bind(&printed_by)
        .bind(date)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let rows: Vec<ReceiptLine> = sqlx::query_as(
            "SELECT code, order_ref
             FROM coleta_protocolos
             WHERE date_iso = $1 AND protocol_id = $2 AND active
             ORDER BY id",
        )
        .bind(date)
        .bind(&protocol_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            protocol = %protocol_id,
            %date,
            stamped,
            printed_by = printed_by.as_deref().unwrap_or(""),
            "Closed collection day"
        );

        Ok(CloseDayResult {
            protocolo: Some(protocol_id),
            date,
            count: rows.len(),
            rows,
        })
    }

    /// Next id for `date`: one past the highest sequence already issued for
    /// it, whatever the print timestamps say. Must run on the connection that
    /// holds the date lock.
    pub async fn next_protocol_id(
        &self,
        conn: &mut PgConnection,
        date: NaiveDate,
    ) -> Result<String, ServiceError> {
        let issued: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT protocol_id
             FROM coleta_protocolos
             WHERE date_iso = $1 AND protocol_id IS NOT NULL",
        )
        .bind(date)
        .fetch_all(&mut *conn)
        .await?;

        Ok(format_protocol_id(
            &self.prefix,
            date,
            next_sequence(issued.iter().map(String::as_str)),
        ))
    }

    /// Closed protocols in `[from, to]`, most recently printed first.
    /// Defaults: `to` is today, `from` is `default_days` before `to`.
    pub async fn history(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        default_days: i64,
    ) -> Result<HistoryResult, ServiceError> {
        let (from, to) = history_window(from, to, self.clock.today(), default_days);

        let rows: Vec<ProtocolAggregateRow> = sqlx::query_as(
            "SELECT
                protocol_id                                    AS protocol_id,
                MIN(printed_at)                                AS printed_at,
                COALESCE(MAX(NULLIF(printed_by, '')), '')      AS printed_by,
                COUNT(*)                                       AS qtd,
                COALESCE(SUM(COALESCE(customer_value, 0)), 0)  AS total_cliente,
                COALESCE(SUM(COALESCE(carrier_value, 0)), 0)   AS total_correios
             FROM coleta_protocolos
             WHERE protocol_id IS NOT NULL
               AND printed_at IS NOT NULL
               AND active
               AND date_iso BETWEEN $1 AND $2
             GROUP BY protocol_id
             ORDER BY MIN(printed_at) DESC",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(HistoryResult {
            from,
            to,
            rows: rows
                .into_iter()
                .map(|row| ProtocolSummary::render(row, &self.clock))
                .collect(),
        })
    }

    /// Active entries of one protocol in insertion order, for reprinting.
    pub async fn protocol_entries(&self, protocol_id: &str) -> Result<Vec<ProtocolItem>, ServiceError> {
        let rows: Vec<ProtocolItemRow> = sqlx::query_as(
            "SELECT code, time_hhmmss, service, uf, nf, order_ref, customer_value, carrier_value
             FROM coleta_protocolos
             WHERE protocol_id = $1 AND active
             ORDER BY id",
        )
        .bind(protocol_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "Protocol {} not found",
                protocol_id
            )));
        }
        Ok(rows.into_iter().map(ProtocolItem::from).collect())
    }
}

/// `PREFIX-YYYYMMDD-NNN`
pub fn format_protocol_id(prefix: &str, date: NaiveDate, sequence: u32) -> String {
    format!(
        "{}-{}-{:0width$}",
        prefix,
        date.format("%Y%m%d"),
        sequence,
        width = SEQUENCE_WIDTH
    )
}

/// Numeric suffix after the last `-`, if it is all digits.
pub fn sequence_of(protocol_id: &str) -> Option<u32> {
    let suffix = protocol_id.rsplit('-').next()?;
    if suffix.len() < SEQUENCE_WIDTH || !suffix.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// One past the highest parseable sequence among `issued`.
pub fn next_sequence<'a>(issued: impl IntoIterator<Item = &'a str>) -> u32 {
    issued
        .into_iter()
        .filter_map(sequence_of)
        .max()
        .unwrap_or(0)
        + 1
}

/// History range: `to` defaults to `today`, `from` to `default_days` before
/// `to`, whichever of them was given.
pub fn history_window(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
    default_days: i64,
) -> (NaiveDate, NaiveDate) {
    let to = to.unwrap_or(today);
    let from = from.unwrap_or_else(|| to - Duration::days(default_days));
    (from, to)
}

fn date_lock_key(date: NaiveDate) -> i32 {
    date.num_days_from_ce()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn formats_date_scoped_ids() {
        assert_eq!(format_protocol_id("PR", day(2025, 1, 1), 1), "PR-20250101-001");
        assert_eq!(format_protocol_id("PR", day(2025, 12, 31), 42), "PR-20251231-042");
        assert_eq!(format_protocol_id("PR", day(2025, 12, 31), 1000), "PR-20251231-1000");
    }

    #[test]
    fn sequence_starts_at_one_and_increments() {
        assert_eq!(next_sequence(std::iter::empty()), 1);
        assert_eq!(next_sequence(["PR-20250101-001"]), 2);
        assert_eq!(next_sequence(["PR-20250101-009"]), 10);
        assert_eq!(next_sequence(["PR-20250101-999"]), 1000);
        assert_eq!(next_sequence(["PR-20250101-1000"]), 1001);
    }

    #[test]
    fn sequence_follows_the_highest_issued_id() {
        // Listed in any order, e.g. when a later closing carries an earlier print time
        assert_eq!(next_sequence(["PR-20250101-002", "PR-20250101-001"]), 3);
        assert_eq!(next_sequence(["PR-20250101-001", "PR-20250101-002"]), 3);
        assert_eq!(next_sequence(["PR-20250101-999", "PR-20250101-1000", "PR-20250101-010"]), 1001);
        assert_eq!(next_sequence(["legacy", "PR-20250101-004"]), 5);
    }

    #[test]
    fn ignores_ids_without_numeric_suffix() {
        assert_eq!(sequence_of("PR-20250101-ABC"), None);
        assert_eq!(sequence_of("PR-20250101-01"), None);
        assert_eq!(sequence_of(""), None);
        assert_eq!(next_sequence(["legacy"]), 1);
    }

    #[test]
    fn lock_keys_differ_per_day() {
        assert_ne!(date_lock_key(day(2025, 1, 1)), date_lock_key(day(2025, 1, 2)));
        assert_eq!(date_lock_key(day(2025, 1, 1)), date_lock_key(day(2025, 1, 1)));
    }

    #[test]
    fn history_defaults_to_thirty_days_ending_today() {
        let today = day(2025, 3, 10);
        assert_eq!(history_window(None, None, today, 30), (day(2025, 2, 8), today));
    }

    #[test]
    fn history_counts_back_from_an_explicit_end() {
        let today = day(2025, 3, 10);
        assert_eq!(
            history_window(None, Some(day(2025, 1, 31)), today, 30),
            (day(2025, 1, 1), day(2025, 1, 31))
        );
    }

    #[test]
    fn history_with_only_a_start_runs_to_today() {
        let today = day(2025, 3, 10);
        assert_eq!(
            history_window(Some(day(2024, 12, 1)), None, today, 30),
            (day(2024, 12, 1), today)
        );
        // A start after today is kept as given and matches nothing
        assert_eq!(
            history_window(Some(day(2025, 4, 1)), None, today, 30),
            (day(2025, 4, 1), today)
        );
    }
}
