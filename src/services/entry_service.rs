use chrono::{Duration, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{info, warn};

use crate::clock::LocalClock;
use crate::database::models::{CollectionEntry, EntryView, NewEntry, ENTRY_COLUMNS};

use super::normalize::{normalize_batch, submissions_from_json};
use super::ServiceError;

/// Merge one submission into the active row for its (code, date), or insert
/// it. Present values win, absent ones never overwrite. Closed rows are left
/// alone, in which case nothing is returned.
const UPSERT_SQL: &str = r#"
    INSERT INTO coleta_protocolos
        (date_iso, time_hhmmss, code, service, uf, peso, nf,
         carrier_value, customer_value, order_ref, registered_by, active)
    VALUES
        ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, TRUE)
    ON CONFLICT (code, date_iso, active) DO UPDATE SET
        service        = COALESCE(EXCLUDED.service,        coleta_protocolos.service),
        uf             = COALESCE(EXCLUDED.uf,             coleta_protocolos.uf),
        peso           = COALESCE(EXCLUDED.peso,           coleta_protocolos.peso),
        nf             = COALESCE(EXCLUDED.nf,             coleta_protocolos.nf),
        carrier_value  = COALESCE(EXCLUDED.carrier_value,  coleta_protocolos.carrier_value),
        customer_value = COALESCE(EXCLUDED.customer_value, coleta_protocolos.customer_value),
        order_ref      = COALESCE(EXCLUDED.order_ref,      coleta_protocolos.order_ref),
        registered_by  = COALESCE(EXCLUDED.registered_by,  coleta_protocolos.registered_by),
        time_hhmmss    = CASE WHEN $12 THEN EXCLUDED.time_hhmmss
                              ELSE coleta_protocolos.time_hhmmss END,
        updated_at     = now()
    WHERE coleta_protocolos.protocol_id IS NULL
    RETURNING id, (xmax = 0) AS inserted
"#;

/// Outcome of one upsert batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub created: usize,
    pub updated: usize,
    /// Hit an entry that already belongs to a protocol.
    pub skipped: usize,
    /// Discarded before storage because the code was empty.
    pub dropped: usize,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteOutcome {
    Soft,
    /// The soft path collided with the (code, date, active) key.
    Hard,
}

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub include_deleted: bool,
}

/// Bounds applied by a listing. Explicit bounds are used as given, open on
/// the missing side; with neither the window is `default_days` back from
/// `today`, open towards the future.
pub fn list_window(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
    default_days: i64,
) -> (Option<NaiveDate>, Option<NaiveDate>) {
    match (from, to) {
        (None, None) => (Some(today - Duration::days(default_days)), None),
        bounds => bounds,
    }
}

pub struct EntryService {
    pool: PgPool,
    clock: LocalClock,
}

impl EntryService {
    pub fn new(pool: PgPool, clock: LocalClock) -> Self {
        Self { pool, clock }
    }

    /// Entries in a date window, newest first. Without bounds the window is
    /// the trailing `default_days`.
    pub async fn list(
        &self,
        filter: &ListFilter,
        default_days: i64,
    ) -> Result<Vec<EntryView>, ServiceError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM coleta_protocolos WHERE TRUE",
            ENTRY_COLUMNS
        ));

        if !filter.include_deleted {
            qb.push(" AND active");
        }
        let (from, to) = list_window(filter.from, filter.to, self.clock.today(), default_days);
        if let Some(from) = from {
            qb.push(" AND date_iso >= ").push_bind(from);
        }
        if let Some(to) = to {
            qb.push(" AND date_iso <= ").push_bind(to);
        }
        qb.push(" ORDER BY date_iso DESC, time_hhmmss DESC, id DESC");

        let rows = qb
            .build_query_as::<CollectionEntry>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| EntryView::render(row, &self.clock))
            .collect())
    }

    /// Normalize and merge a posted object or list in one transaction.
    pub async fn upsert(&self, payload: Value) -> Result<UpsertSummary, ServiceError> {
        let submissions = submissions_from_json(payload)?;
        let batch = normalize_batch(submissions, &self.clock)?;

        let mut summary = UpsertSummary {
            dropped: batch.dropped,
            ..Default::default()
        };
        if batch.entries.is_empty() {
            return Ok(summary);
        }

        let mut tx = self.pool.begin().await?;
        for entry in &batch.entries {
            match Self::upsert_one(&mut tx, entry).await? {
                Some(true) => summary.created += 1,
                Some(false) => summary.updated += 1,
                None => summary.skipped += 1,
            }
        }
        tx.commit().await?;

        summary.count = summary.created + summary.updated;
        info!(
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            dropped = summary.dropped,
            "Upserted collection entries"
        );
        Ok(summary)
    }

    /// `Some(inserted)` when a row was written, `None` when the key is closed.
    async fn upsert_one(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        entry: &NewEntry,
    ) -> Result<Option<bool>, ServiceError> {
        let row: Option<(i64, bool)> = sqlx::query_as(UPSERT_SQL)
            .bind(entry.date_iso)
            .bind(entry.time_hhmmss)
            .bind(&entry.code)
            .bind(&entry.service)
            .bind(&entry.uf)
            .bind(&entry.peso)
            .bind(&entry.nf)
            .bind(entry.carrier_value)
            .bind(entry.customer_value)
            .bind(&entry.order_ref)
            .bind(&entry.registered_by)
            .bind(entry.time_given)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(row.map(|(_, inserted)| inserted))
    }

    /// Mark an entry inactive. Falls back to removing the row when an
    /// inactive twin with the same key already exists.
    pub async fn soft_delete(&self, id: i64) -> Result<DeleteOutcome, ServiceError> {
        let mut conn = self.pool.acquire().await?;

        let soft = sqlx::query(
            "UPDATE coleta_protocolos
             SET active = FALSE, deleted_at = now(), updated_at = now()
             WHERE id = $1 AND active",
        )
        .bind(id)
        .execute(&mut *conn)
        .await;

        match soft {
            Ok(done) if done.rows_affected() > 0 => {
                info!(id, "Soft-deleted collection entry");
                Ok(DeleteOutcome::Soft)
            }
            Ok(_) => {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM coleta_protocolos WHERE id = $1)")
                        .bind(id)
                        .fetch_one(&mut *conn)
                        .await?;
                if exists {
                    Ok(DeleteOutcome::Soft)
                } else {
                    Err(ServiceError::NotFound(format!("Entry {} not found", id)))
                }
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                warn!(id, "Soft delete collides with an inactive twin, deleting permanently");
                let done = sqlx::query("DELETE FROM coleta_protocolos WHERE id = $1")
                    .bind(id)
                    .execute(&mut *conn)
                    .await?;
                if done.rows_affected() == 0 {
                    return Err(ServiceError::NotFound(format!("Entry {} not found", id)));
                }
                Ok(DeleteOutcome::Hard)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reactivate an entry. Protocol stamps are kept as they are.
    pub async fn restore(&self, id: i64) -> Result<EntryView, ServiceError> {
        let sql = format!(
            "UPDATE coleta_protocolos
             SET active = TRUE, deleted_at = NULL, updated_at = now()
             WHERE id = $1
             RETURNING {}",
            ENTRY_COLUMNS
        );

        let restored = sqlx::query_as::<_, CollectionEntry>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;

        match restored {
            Ok(Some(entry)) => {
                info!(id, code = %entry.code, "Restored collection entry");
                Ok(EntryView::render(entry, &self.clock))
            }
            Ok(None) => Err(ServiceError::NotFound(format!("Entry {} not found", id))),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(ServiceError::Conflict(format!(
                    "An active entry with the same code and date already exists (entry {})",
                    id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn unbounded_listing_covers_the_trailing_week() {
        let today = day(2025, 3, 10);
        assert_eq!(list_window(None, None, today, 7), (Some(day(2025, 3, 3)), None));
        assert_eq!(list_window(None, None, day(2025, 3, 2), 7), (Some(day(2025, 2, 23)), None));
    }

    #[test]
    fn only_upper_bound_stays_open_below() {
        let today = day(2025, 3, 10);
        assert_eq!(
            list_window(None, Some(day(2025, 1, 31)), today, 7),
            (None, Some(day(2025, 1, 31)))
        );
    }

    #[test]
    fn only_lower_bound_stays_open_above() {
        let today = day(2025, 3, 10);
        assert_eq!(
            list_window(Some(day(2025, 1, 1)), None, today, 7),
            (Some(day(2025, 1, 1)), None)
        );
        assert_eq!(
            list_window(Some(day(2025, 1, 1)), Some(day(2025, 1, 5)), today, 7),
            (Some(day(2025, 1, 1)), Some(day(2025, 1, 5)))
        );
    }
}
