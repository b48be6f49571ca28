//! Data models
//!
//! Shared between clinic-server and frontend (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are snowflake `i64`; timestamps are Unix milliseconds.

pub mod appointment;
pub mod invoice;
pub mod patient;
pub mod queue;

// Re-exports
pub use appointment::*;
pub use invoice::*;
pub use patient::*;
pub use queue::*;
