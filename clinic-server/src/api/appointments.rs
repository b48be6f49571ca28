//! Appointment API

use axum::{
    Router,
    extract::{Extension, Json, Path, Query, State},
    routing::{get, put},
};
use serde::Deserialize;
use shared::error::ApiResponse;
use shared::models::{
    Appointment, AppointmentCreate, AppointmentStatus, AppointmentStatusUpdate, AppointmentUpdate,
    Availability, TimeSlot,
};
use shared::response::{PageQuery, PaginatedResponse};

use super::ApiResult;
use crate::auth::TenantIdentity;
use crate::db::appointment::AppointmentFilter;
use crate::services::appointment;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/appointments", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/availability", get(availability))
        .route("/slots", get(slots))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
        .route("/{id}/status", put(update_status))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub date: Option<String>,
    pub doctor_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub status: Option<AppointmentStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub doctor_id: i64,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    /// Appointment being rescheduled
    pub exclude_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub doctor_id: i64,
    pub date: String,
    #[serde(default = "default_day_start")]
    pub day_start: String,
    #[serde(default = "default_day_end")]
    pub day_end: String,
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: i64,
}

fn default_day_start() -> String {
    "08:00".into()
}

fn default_day_end() -> String {
    "17:00".into()
}

fn default_slot_minutes() -> i64 {
    30
}

/// GET /api/appointments
pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<Appointment>> {
    let filter = AppointmentFilter {
        date: query.date,
        doctor_id: query.doctor_id,
        patient_id: query.patient_id,
        status: query.status,
    };
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    };
    Ok(ApiResponse::success(
        appointment::list(&state, &identity, filter, page).await?,
    ))
}

/// GET /api/appointments/availability
pub async fn availability(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Query(query): Query<AvailabilityQuery>,
) -> ApiResult<Availability> {
    let available = appointment::check_availability(
        &state,
        &identity,
        query.doctor_id,
        &query.date,
        &query.start_time,
        &query.end_time,
        query.exclude_id,
    )
    .await?;
    Ok(ApiResponse::success(Availability { available }))
}

/// GET /api/appointments/slots
pub async fn slots(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Query(query): Query<SlotsQuery>,
) -> ApiResult<Vec<TimeSlot>> {
    let slots = appointment::available_slots(
        &state,
        &identity,
        query.doctor_id,
        &query.date,
        &query.day_start,
        &query.day_end,
        query.slot_minutes,
    )
    .await?;
    Ok(ApiResponse::success(slots))
}

/// GET /api/appointments/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Path(id): Path<i64>,
) -> ApiResult<Appointment> {
    Ok(ApiResponse::success(
        appointment::get(&state, &identity, id).await?,
    ))
}

/// POST /api/appointments
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Json(payload): Json<AppointmentCreate>,
) -> ApiResult<Appointment> {
    Ok(ApiResponse::success(
        appointment::create(&state, &identity, payload).await?,
    ))
}

/// PUT /api/appointments/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Path(id): Path<i64>,
    Json(payload): Json<AppointmentUpdate>,
) -> ApiResult<Appointment> {
    Ok(ApiResponse::success(
        appointment::update(&state, &identity, id, payload).await?,
    ))
}

/// PUT /api/appointments/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Path(id): Path<i64>,
    Json(payload): Json<AppointmentStatusUpdate>,
) -> ApiResult<Appointment> {
    Ok(ApiResponse::success(
        appointment::update_status(&state, &identity, id, payload).await?,
    ))
}

/// DELETE /api/appointments/{id}
pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Path(id): Path<i64>,
) -> ApiResult<bool> {
    appointment::delete(&state, &identity, id).await?;
    Ok(ApiResponse::success(true))
}
