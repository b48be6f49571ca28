//! Audit log endpoint

use axum::{
    Router,
    extract::{Extension, Query, State},
    routing::get,
};
use serde::Deserialize;
use shared::error::ApiResponse;
use shared::response::{PageQuery, PaginatedResponse};

use super::ApiResult;
use crate::auth::TenantIdentity;
use crate::db::audit::{self, AuditEntry};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/audit-log", get(audit_log))
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// GET /api/audit-log
pub async fn audit_log(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<PaginatedResponse<AuditEntry>> {
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    };
    let (entries, total) = audit::query(
        &state.pool,
        &identity.tenant_id,
        query.resource_type.as_deref(),
        query.resource_id.as_deref(),
        page.limit(),
        page.offset(),
    )
    .await
    .map_err(crate::error::ServiceError::from)?;

    Ok(ApiResponse::success(PaginatedResponse::new(
        entries,
        page.page(),
        page.per_page(),
        total as u64,
    )))
}
