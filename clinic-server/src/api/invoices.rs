//! Invoice & Payment API

use axum::{
    Router,
    extract::{Extension, Json, Path, Query, State},
    routing::{get, post},
};
use serde::Deserialize;
use shared::error::ApiResponse;
use shared::models::{
    Invoice, InvoiceCreate, InvoiceStatus, InvoiceUpdate, Payment, PaymentCreate, PaymentReceipt,
};
use shared::response::{PageQuery, PaginatedResponse};

use super::ApiResult;
use crate::auth::TenantIdentity;
use crate::services::billing;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/invoices", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_by_id).put(update))
        .route("/{id}/cancel", post(cancel))
        .route("/{id}/payments", get(list_payments).post(record_payment))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<InvoiceStatus>,
    pub patient_id: Option<i64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// GET /api/invoices
pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<Invoice>> {
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    };
    Ok(ApiResponse::success(
        billing::list(&state, &identity, query.status, query.patient_id, page).await?,
    ))
}

/// GET /api/invoices/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Path(id): Path<i64>,
) -> ApiResult<Invoice> {
    Ok(ApiResponse::success(billing::get(&state, &identity, id).await?))
}

/// POST /api/invoices
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Json(payload): Json<InvoiceCreate>,
) -> ApiResult<Invoice> {
    Ok(ApiResponse::success(
        billing::create(&state, &identity, payload).await?,
    ))
}

/// PUT /api/invoices/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Path(id): Path<i64>,
    Json(payload): Json<InvoiceUpdate>,
) -> ApiResult<Invoice> {
    Ok(ApiResponse::success(
        billing::update(&state, &identity, id, payload).await?,
    ))
}

/// POST /api/invoices/{id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Path(id): Path<i64>,
) -> ApiResult<Invoice> {
    Ok(ApiResponse::success(
        billing::cancel(&state, &identity, id).await?,
    ))
}

/// GET /api/invoices/{id}/payments
pub async fn list_payments(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<Payment>> {
    Ok(ApiResponse::success(
        billing::list_payments(&state, &identity, id).await?,
    ))
}

/// POST /api/invoices/{id}/payments
pub async fn record_payment(
    State(state): State<AppState>,
    Extension(identity): Extension<TenantIdentity>,
    Path(id): Path<i64>,
    Json(payload): Json<PaymentCreate>,
) -> ApiResult<PaymentReceipt> {
    Ok(ApiResponse::success(
        billing::record_payment(&state, &identity, id, payload).await?,
    ))
}
