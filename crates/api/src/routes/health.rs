//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use store::ProductStore;

use crate::routes::purchase::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub consumers: usize,
}

/// GET /health: liveness plus the number of wired consumers.
pub async fn check<S: ProductStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        consumers: state.dispatcher.subscriber_count(),
    })
}
