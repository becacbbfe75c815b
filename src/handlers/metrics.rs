//! Metrics exposition handler

use axum::{extract::State, http::header, response::IntoResponse};

use crate::AppState;
use crate::metrics::CONTENT_TYPE;

pub async fn export(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, CONTENT_TYPE)],
        state.service.metrics().render(),
    )
}
