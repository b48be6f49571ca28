//! HTTP API
//!
//! `/health` is public; everything under `/api` requires a tenant JWT.
//! Successful responses use the `{success, data}` envelope, errors render
//! through `AppError`.

pub mod appointments;
pub mod audit;
pub mod health;
pub mod invoices;
pub mod patients;
pub mod queue;

use std::time::Duration;

use axum::{Router, middleware};
use http::{HeaderName, HeaderValue, StatusCode};
use shared::error::{ApiResponse, AppError};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::tenant_auth_middleware;
use crate::state::AppState;

pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Snowflake request IDs
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        Some(RequestId::new(HeaderValue::from(
            shared::util::snowflake_id(),
        )))
    }
}

/// Tenant-scoped API routes, without auth or middleware
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(patients::router())
        .merge(appointments::router())
        .merge(queue::router())
        .merge(invoices::router())
        .merge(audit::router())
}

/// Build the full application: routes, auth, tracing, timeout and request IDs
pub fn create_router(state: AppState) -> Router {
    let timeout = Duration::from_millis(state.config.request_timeout_ms);

    let protected = api_router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        tenant_auth_middleware,
    ));

    Router::new()
        .merge(health::router())
        .merge(protected)
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            XRequestId,
        ))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .with_state(state)
}
