//! Shared types for the clinic service
//!
//! Domain models, the unified error system, the response envelope and
//! pagination types used by `clinic-server` and its clients.

pub mod error;
pub mod models;
pub mod response;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use response::{PageQuery, PaginatedResponse, Pagination};
