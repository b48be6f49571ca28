//! Application state

use std::sync::Arc;

use shared::error::AppError;
use sqlx::SqlitePool;

use crate::audit::AuditService;
use crate::config::Config;
use crate::db::DbService;
use crate::notify::{LogNotifier, Notifier};

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection pool
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub audit: AuditService,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Open the database from `config` and wire the default services
    pub async fn new(config: Config) -> Result<Self, AppError> {
        let db = DbService::new(&config.database_url, config.db_max_connections).await?;
        Ok(Self::with_pool(config, db.pool))
    }

    pub fn with_pool(config: Config, pool: SqlitePool) -> Self {
        Self {
            audit: AuditService::new(pool.clone()),
            pool,
            config: Arc::new(config),
            notifier: Arc::new(LogNotifier),
        }
    }

    /// Replace the notifier
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}
