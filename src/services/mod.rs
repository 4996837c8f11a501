pub mod color_service;
pub mod employee_service;
pub mod entry_service;
pub mod normalize;
pub mod production_service;
pub mod protocol_service;

use std::collections::HashMap;

use thiserror::Error;

use crate::database::manager::DatabaseError;

pub use color_service::ColorService;
pub use employee_service::EmployeeService;
pub use entry_service::{DeleteOutcome, EntryService, ListFilter, UpsertSummary};
pub use production_service::ProductionService;
pub use protocol_service::{CloseDayResult, HistoryResult, ProtocolService};

/// Business-level failures shared by every service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    Validation {
        message: String,
        field_errors: HashMap<String, String>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation {
            message: message.into(),
            field_errors: HashMap::new(),
        }
    }

    pub fn field(field: impl Into<String>, error: impl Into<String>) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(field.into(), error.into());
        ServiceError::Validation {
            message: "Invalid field value".to_string(),
            field_errors,
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Database(DatabaseError::Sqlx(err))
    }
}
