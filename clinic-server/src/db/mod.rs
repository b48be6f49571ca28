//! Database Module
//!
//! SQLite connection pool, migrations and the tenant-scoped repositories.
//! Repositories are free functions over `&SqlitePool` (or an open
//! transaction) and every query filters by `tenant_id`.

pub mod appointment;
pub mod audit;
pub mod invoice;
pub mod patient;
pub mod queue;
pub mod sequence;

use std::str::FromStr;
use std::time::Duration;

use shared::error::AppError;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

/// Database service, owns the SQLite connection pool
#[derive(Clone)]
pub struct DbService {
    pub pool: SqlitePool,
}

impl DbService {
    /// Open (or create) the database with WAL, foreign keys and a 5s busy timeout,
    /// then apply migrations.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        let in_memory = database_url.contains(":memory:");

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::database(format!("Invalid database URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_millis(5000));

        // Every connection to `:memory:` is a separate database
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

        tracing::info!("Database connection established (SQLite WAL, busy_timeout=5000ms)");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to apply migrations: {e}")))?;
        tracing::info!("Database migrations applied");

        Ok(Self { pool })
    }

    /// Fresh in-memory database with the schema applied
    pub async fn in_memory() -> Result<Self, AppError> {
        Self::new("sqlite::memory:", 1).await
    }
}

/// Shared column lists, kept next to each other so row structs and
/// `SELECT`s stay in sync.
pub(crate) mod columns {
    pub const PATIENT: &str = "id, tenant_id, patient_number, first_name, last_name, date_of_birth, gender, phone, email, address, notes, created_at, updated_at, deleted_at";

    pub const APPOINTMENT: &str = "id, tenant_id, patient_id, doctor_id, appointment_date, start_time, end_time, appointment_type, reason, notes, status, arrived_at, started_at, completed_at, cancelled_at, cancelled_by, cancellation_reason, created_by, created_at, updated_at, deleted_at";

    pub const QUEUE_ENTRY: &str = "id, tenant_id, appointment_id, patient_id, doctor_id, queue_number, position, status, estimated_wait_minutes, checked_in_at, called_at, completed_at, created_at, updated_at";

    pub const INVOICE: &str = "id, tenant_id, invoice_number, patient_id, appointment_id, subtotal, discount, tax, total, paid_amount, balance, status, due_date, notes, created_by, created_at, updated_at";

    pub const PAYMENT: &str =
        "id, tenant_id, invoice_id, amount, method, reference, notes, received_by, paid_at";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_applies_migrations() {
        let db = DbService::in_memory().await.unwrap();
        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(&db.pool)
                .await
                .unwrap();
        for table in ["appointment", "audit_log", "invoice", "patient", "queue_entry"] {
            assert!(tables.iter().any(|t| t == table), "missing table {table}");
        }
    }
}
