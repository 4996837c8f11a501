use std::collections::HashMap;

use sqlx::PgPool;
use tracing::info;

use crate::database::models::ColorMapping;

use super::ServiceError;

pub struct ColorService {
    pool: PgPool,
}

impl ColorService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<ColorMapping>, ServiceError> {
        let rows = sqlx::query_as::<_, ColorMapping>(
            "SELECT palavra, grupo_cor FROM mapa_cores ORDER BY palavra",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create(&self, palavra: &str, grupo_cor: &str) -> Result<ColorMapping, ServiceError> {
        let mapping = validate(palavra, grupo_cor)?;

        let inserted = sqlx::query("INSERT INTO mapa_cores (palavra, grupo_cor) VALUES ($1, $2)")
            .bind(&mapping.palavra)
            .bind(&mapping.grupo_cor)
            .execute(&self.pool)
            .await;

        match inserted {
            Ok(_) => {
                info!(palavra = %mapping.palavra, grupo_cor = %mapping.grupo_cor, "Added color mapping");
                Ok(mapping)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                ServiceError::Conflict(format!("Color word '{}' already exists", mapping.palavra)),
            ),
            Err(e) => Err(e.into()),
        }
    }
}

/// Words are matched case-insensitively, so they are stored lower-cased.
pub fn validate(palavra: &str, grupo_cor: &str) -> Result<ColorMapping, ServiceError> {
    let palavra = palavra.trim().to_lowercase();
    let grupo_cor = grupo_cor.trim().to_string();

    let mut field_errors = HashMap::new();
    if palavra.is_empty() {
        field_errors.insert("palavra".to_string(), "This field is required".to_string());
    }
    if grupo_cor.is_empty() {
        field_errors.insert("grupo_cor".to_string(), "This field is required".to_string());
    }
    if !field_errors.is_empty() {
        return Err(ServiceError::Validation {
            message: "Required fields: palavra and grupo_cor".to_string(),
            field_errors,
        });
    }

    Ok(ColorMapping { palavra, grupo_cor })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_word_and_trims_group() {
        let mapping = validate("  Azul Marinho ", " azul ").unwrap();
        assert_eq!(mapping.palavra, "azul marinho");
        assert_eq!(mapping.grupo_cor, "azul");
    }

    #[test]
    fn requires_both_fields() {
        match validate(" ", "") {
            Err(ServiceError::Validation { field_errors, .. }) => {
                assert!(field_errors.contains_key("palavra"));
                assert!(field_errors.contains_key("grupo_cor"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
