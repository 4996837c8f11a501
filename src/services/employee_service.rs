use sqlx::PgPool;
use tracing::info;

use crate::database::models::Employee;

use super::ServiceError;

/// Advisory lock serializing default-flag changes.
const DEFAULT_OPERATOR_LOCK: i64 = 0x4655_4e43;

pub struct EmployeeService {
    pool: PgPool,
}

impl EmployeeService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Employee>, ServiceError> {
        let rows = sqlx::query_as::<_, Employee>(
            "SELECT id, name, is_default FROM funcionarios ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create(&self, name: &str, is_default: bool) -> Result<Employee, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::field("name", "This field is required"));
        }

        let mut tx = self.pool.begin().await?;
        let employee = sqlx::query_as::<_, Employee>(
            "INSERT INTO funcionarios (name) VALUES ($1) RETURNING id, name, is_default",
        )
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;

        let employee = if is_default {
            Self::make_default(&mut tx, employee.id).await?
        } else {
            employee
        };
        tx.commit().await?;

        info!(id = employee.id, name = %employee.name, "Registered operator");
        Ok(employee)
    }

    pub async fn set_default(&self, id: i64) -> Result<Employee, ServiceError> {
        let mut tx = self.pool.begin().await?;
        let employee = Self::make_default(&mut tx, id).await?;
        tx.commit().await?;

        info!(id, name = %employee.name, "Default operator changed");
        Ok(employee)
    }

    /// Clear every default flag, then set it on `id`. Dropping the
    /// transaction on the not-found path rolls the clear back.
    async fn make_default(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: i64,
    ) -> Result<Employee, ServiceError> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(DEFAULT_OPERATOR_LOCK)
            .execute(&mut **tx)
            .await?;

        sqlx::query("UPDATE funcionarios SET is_default = FALSE WHERE is_default")
            .execute(&mut **tx)
            .await?;

        sqlx::query_as::<_, Employee>(
            "UPDATE funcionarios SET is_default = TRUE WHERE id = $1 RETURNING id, name, is_default",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Operator {} not found", id)))
    }
}
