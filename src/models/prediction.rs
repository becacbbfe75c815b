//! Prediction model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, Utc};
use validator::Validate;

use crate::model::{MetricsSnapshot, Recommendation};

/// One recorded prediction. Rows are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: Uuid,
    pub run_id: Option<String>,
    pub signal_id: Option<String>,
    pub model_version: String,
    pub probability: f64,
    pub recommendation: Recommendation,
    pub created_at: DateTime<Utc>,
}

/// Storage shape: `recommendation` kept as JSONB
#[derive(Debug, FromRow)]
pub struct PredictionRow {
    pub id: Uuid,
    pub run_id: Option<String>,
    pub signal_id: Option<String>,
    pub model_version: String,
    pub probability: f64,
    pub recommendation: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PredictionRow> for Prediction {
    type Error = serde_json::Error;

    fn try_from(row: PredictionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            run_id: row.run_id,
            signal_id: row.signal_id,
            model_version: row.model_version,
            probability: row.probability,
            recommendation: serde_json::from_value(row.recommendation)?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct PredictRequest {
    #[validate(length(max = 255))]
    pub run_id: Option<String>,
    #[validate(length(max = 255))]
    pub signal_id: Option<String>,
    #[serde(default)]
    pub metrics_data: Option<MetricsSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub id: Uuid,
    pub probability: f64,
    pub model_version: String,
    pub recommendations: Recommendation,
    pub created_at: DateTime<Utc>,
}

impl From<&Prediction> for PredictResponse {
    fn from(p: &Prediction) -> Self {
        Self {
            id: p.id,
            probability: p.probability,
            model_version: p.model_version.clone(),
            recommendations: p.recommendation.clone(),
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct PredictionFilter {
    pub limit: Option<i64>,
    pub run_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionList {
    pub predictions: Vec<Prediction>,
}
