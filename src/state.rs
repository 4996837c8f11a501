use std::sync::Arc;

use crate::clock::LocalClock;
use crate::config::AppConfig;
use crate::database::Database;
use crate::services::{
    ColorService, EmployeeService, EntryService, ProductionService, ProtocolService,
};

/// Shared per-process dependencies handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub clock: LocalClock,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig, clock: LocalClock) -> Self {
        Self {
            db,
            config: Arc::new(config),
            clock,
        }
    }

    pub fn entries(&self) -> EntryService {
        EntryService::new(self.db.pool().clone(), self.clock)
    }

    pub fn protocols(&self) -> ProtocolService {
        ProtocolService::new(
            self.db.pool().clone(),
            self.clock,
            self.config.coleta.protocol_prefix.clone(),
        )
    }

    pub fn productions(&self) -> ProductionService {
        ProductionService::new(self.db.pool().clone(), self.clock)
    }

    pub fn colors(&self) -> ColorService {
        ColorService::new(self.db.pool().clone())
    }

    pub fn employees(&self) -> EmployeeService {
        EmployeeService::new(self.db.pool().clone())
    }
}
