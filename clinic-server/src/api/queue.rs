//! Queue API

use axum::{
    Router,
    extract::{Extension, Json, Path, Query, State},
    routing::{get, post, put},
};
use serde::Deserialize;
use shared::error::ApiResponse;
use shared::models::{QueueCallNext, QueueEntry, QueueStatus, QueueStatusUpdate};

use super::ApiResult;
use crate::auth::TenantIdentity;
use crate::services::queue;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/queue", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/call-next", post(call_next))
        .route("/{id}", get(get_by_id))
        .route("/{id}/status", put(update_status))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub doctor_id: Option<i64>,
    pub status: Option<QueueStatus>,
}

/// GET /api/queue
pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<QueueEntry>> {
    Ok(ApiResponse::success(
        queue::list(&state, &identity, query.doctor_id, query.status).await?,
    ))
}

/// GET /api/queue/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Path(id): Path<i64>,
) -> ApiResult<QueueEntry> {
    Ok(ApiResponse::success(queue::get(&state, &identity, id).await?))
}

/// POST /api/queue/call-next
pub async fn call_next(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Json(payload): Json<QueueCallNext>,
) -> ApiResult<QueueEntry> {
    Ok(ApiResponse::success(
        queue::call_next(&state, &identity, payload.doctor_id).await?,
    ))
}

/// PUT /api/queue/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Path(id): Path<i64>,
    Json(payload): Json<QueueStatusUpdate>,
) -> ApiResult<QueueEntry> {
    Ok(ApiResponse::success(
        queue::update_status(&state, &identity, id, payload.status).await?,
    ))
}
