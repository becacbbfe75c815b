//! Prediction handlers

use axum::{extract::{State, Path, Query}, Json};
use uuid::Uuid;
use validator::Validate;

use crate::{AppState, AppResult, AppError};
use crate::models::{PredictRequest, PredictResponse, Prediction, PredictionFilter, PredictionList};

/// Score metrics and record the prediction
pub async fn predict(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> AppResult<Json<PredictResponse>> {
    req.validate()?;

    let response = state.service
        .predict(req)
        .await
        .map_err(AppError::persistence)?;

    Ok(Json(response))
}

/// List most recent predictions, optionally for one run
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<PredictionFilter>,
) -> AppResult<Json<PredictionList>> {
    let limit = filter.limit.unwrap_or(state.config.default_list_limit);

    let predictions = match filter.run_id.as_deref() {
        Some(run_id) => state.service.list_by_run(run_id, limit).await?,
        None => state.service.list(limit).await?,
    };

    Ok(Json(PredictionList { predictions }))
}

/// Get single prediction
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Prediction>> {
    let prediction = state.service
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Prediction not found".to_string()))?;

    Ok(Json(prediction))
}
