//! Patient API

use axum::{
    Router,
    extract::{Extension, Json, Path, Query, State},
    routing::get,
};
use serde::Deserialize;
use shared::error::ApiResponse;
use shared::models::{Patient, PatientCreate, PatientUpdate};
use shared::response::{PageQuery, PaginatedResponse};

use super::ApiResult;
use crate::auth::TenantIdentity;
use crate::services::patient;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/patients", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Matches first/last name, phone or patient number
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// GET /api/patients
pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<Patient>> {
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    };
    let result = patient::list(&state, &identity, query.search.as_deref(), page).await?;
    Ok(ApiResponse::success(result))
}

/// GET /api/patients/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Path(id): Path<i64>,
) -> ApiResult<Patient> {
    Ok(ApiResponse::success(patient::get(&state, &identity, id).await?))
}

/// POST /api/patients
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Json(payload): Json<PatientCreate>,
) -> ApiResult<Patient> {
    Ok(ApiResponse::success(
        patient::create(&state, &identity, payload).await?,
    ))
}

/// PUT /api/patients/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Path(id): Path<i64>,
    Json(payload): Json<PatientUpdate>,
) -> ApiResult<Patient> {
    Ok(ApiResponse::success(
        patient::update(&state, &identity, id, payload).await?,
    ))
}

/// DELETE /api/patients/{id}
pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Path(id): Path<i64>,
) -> ApiResult<bool> {
    patient::delete(&state, &identity, id).await?;
    Ok(ApiResponse::success(true))
}
