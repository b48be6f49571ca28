//! Unified service-layer error type
//!
//! `ServiceError` bridges database errors (`sqlx::Error`) and the API-layer
//! error (`AppError`) so services can use `?` on both.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

/// Service-layer error
///
/// - `Db`: database errors (logged, mapped to a generic error for the client)
/// - `App`: business-rule errors (passed through unchanged)
#[derive(Debug)]
pub enum ServiceError {
    Db(sqlx::Error),
    App(AppError),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Db(e) => write!(f, "database error: {e}"),
            ServiceError::App(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Db(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(e: validator::ValidationErrors) -> Self {
        ServiceError::App(e.into())
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(sqlx::Error::RowNotFound) => AppError::new(ErrorCode::NotFound),
            ServiceError::Db(db_err) => {
                if let Some(db) = db_err.as_database_error() {
                    if db.is_unique_violation() {
                        tracing::warn!(error = %db_err, "Unique constraint violation");
                        return AppError::new(ErrorCode::AlreadyExists);
                    }
                    if db.is_foreign_key_violation() {
                        tracing::warn!(error = %db_err, "Foreign key violation");
                        return AppError::with_message(
                            ErrorCode::InvalidRequest,
                            "Referenced record does not exist",
                        );
                    }
                }
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;
