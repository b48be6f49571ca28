//! Health check endpoint

use axum::{Json, Router, extract::State, routing::get};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let database = match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!("Health check database query failed: {e}");
            "unavailable"
        }
    };
    Json(serde_json::json!({
        "status": "ok",
        "service": "clinic-server",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
    }))
}
