//! clinic-server: multi-tenant clinic backend
//!
//! Appointments with conflict detection, a per-doctor waiting queue,
//! patients, invoices with payments and an audit trail, served as a JSON
//! API over SQLite.

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod notify;
pub mod scheduling;
pub mod services;
pub mod state;
pub mod utils;

pub use api::create_router;
pub use config::Config;
pub use state::AppState;
