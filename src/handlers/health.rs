//! Health check handler

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    /// Fixed-weight models are ready as soon as they are constructed
    model_trained: bool,
    model_version: String,
    timestamp: DateTime<Utc>,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        model_trained: true,
        model_version: state.service.model().version().to_string(),
        timestamp: Utc::now(),
    })
}
