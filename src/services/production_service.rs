use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use crate::clock::LocalClock;
use crate::database::models::{
    NewProduction, ProductKey, Production, ProductionChanges, ProductionStatus, ProductionView,
    PRODUCTION_COLUMNS,
};

use super::ServiceError;

pub struct ProductionService {
    pool: PgPool,
    clock: LocalClock,
}

impl ProductionService {
    pub fn new(pool: PgPool, clock: LocalClock) -> Self {
        Self { pool, clock }
    }

    pub async fn list(&self) -> Result<Vec<ProductionView>, ServiceError> {
        let sql = format!("SELECT {} FROM producao ORDER BY id", PRODUCTION_COLUMNS);
        let rows: Vec<Production> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(self.render_all(rows))
    }

    pub async fn create(&self, input: NewProduction) -> Result<ProductionView, ServiceError> {
        let status = match input.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(parse_status(raw)?),
            None => None,
        };
        let quantidade = input.quantidade.unwrap_or(1);
        if quantidade < 0 {
            return Err(ServiceError::field("quantidade", "Must not be negative"));
        }

        let sql = format!(
            "INSERT INTO producao (produto, tamanho, erp_id, status, quantidade, origem, criado_em)
             VALUES ($1, $2, $3, $4, $5, $6, now())
             RETURNING {}",
            PRODUCTION_COLUMNS
        );
        let row: Production = sqlx::query_as(&sql)
            .bind(&input.produto)
            .bind(&input.tamanho)
            .bind(&input.erp_id)
            .bind(status.map(|s| s.as_str()))
            .bind(quantidade)
            .bind(&input.origem)
            .fetch_one(&self.pool)
            .await?;

        info!(id = row.id, "Created production item");
        Ok(ProductionView::render(row, &self.clock))
    }

    /// Apply the present fields. A status change also stamps the matching
    /// stage timestamp.
    pub async fn update(&self, id: i64, changes: ProductionChanges) -> Result<ProductionView, ServiceError> {
        let status = changes.status.as_deref().map(parse_status).transpose()?;

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE producao SET ");
        let mut fields = qb.separated(", ");
        let mut any = false;

        if let Some(status) = status {
            fields.push("status = ").push_bind_unseparated(status.as_str());
            fields.push(format!("{} = now()", status.timestamp_column()));
            any = true;
        }
        if let Some(quantidade) = changes.quantidade {
            if quantidade < 0 {
                return Err(ServiceError::field("quantidade", "Must not be negative"));
            }
            fields.push("quantidade = ").push_bind_unseparated(quantidade);
            any = true;
        }
        if let Some(desativado) = changes.desativado {
            fields.push("desativado = ").push_bind_unseparated(desativado);
            any = true;
        }
        if let Some(observacao) = changes.observacao {
            fields.push("observacao = ").push_bind_unseparated(observacao);
            any = true;
        }

        if !any {
            return Err(ServiceError::validation("No updatable field was sent"));
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {}", PRODUCTION_COLUMNS));

        let row = qb
            .build_query_as::<Production>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Production item {} not found", id)))?;

        info!(id, status = row.status.as_deref().unwrap_or(""), "Updated production item");
        Ok(ProductionView::render(row, &self.clock))
    }

    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        let done = sqlx::query("DELETE FROM producao WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(ServiceError::NotFound(format!("Production item {} not found", id)));
        }
        info!(id, "Deleted production item");
        Ok(())
    }

    /// Distinct catalog keys seen in production, for importing products.
    pub async fn distinct_products(&self) -> Result<Vec<ProductKey>, ServiceError> {
        let rows = sqlx::query_as::<_, ProductKey>(
            "SELECT DISTINCT produto, tamanho, erp_id
             FROM producao
             WHERE produto IS NOT NULL AND tamanho IS NOT NULL AND erp_id IS NOT NULL
             ORDER BY produto, tamanho, erp_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    fn render_all(&self, rows: Vec<Production>) -> Vec<ProductionView> {
        rows.into_iter()
            .map(|row| ProductionView::render(row, &self.clock))
            .collect()
    }
}

fn parse_status(raw: &str) -> Result<ProductionStatus, ServiceError> {
    ProductionStatus::parse(raw).ok_or_else(|| {
        ServiceError::field(
            "status",
            format!(
                "Unknown status '{}', expected one of on_demand, fila, construcao, finalizado",
                raw
            ),
        )
    })
}
