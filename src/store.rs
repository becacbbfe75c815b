//! Prediction storage
//!
//! Append-only persistence for predictions. `PgPredictionStore` is the
//! production backend; `MemoryPredictionStore` keeps rows in-process for
//! tests and local runs without a database.

use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Prediction, PredictionRow};

/// PostgreSQL SQLSTATE codes we map explicitly
const PG_CHECK_VIOLATION: &str = "23514";
const PG_UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("probability {0} outside [0, 1]")]
    ProbabilityOutOfRange(f64),

    #[error("prediction {0} already exists")]
    DuplicateId(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("recommendation (de)serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Append and query predictions. No update or delete by design of the log.
#[async_trait]
pub trait PredictionStore: Send + Sync {
    /// Durably record one prediction. Returns only after the write commits.
    async fn insert(&self, prediction: &Prediction) -> Result<(), StoreError>;

    /// Most recent `limit` predictions, newest first
    async fn list_recent(&self, limit: i64) -> Result<Vec<Prediction>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Prediction>, StoreError>;

    /// Most recent `limit` predictions for one run, newest first
    async fn list_by_run(&self, run_id: &str, limit: i64) -> Result<Vec<Prediction>, StoreError>;
}

/// Typed error for constraint violations reported by PostgreSQL on insert
fn constraint_violation(sqlstate: Option<&str>, prediction: &Prediction) -> Option<StoreError> {
    match sqlstate {
        Some(PG_CHECK_VIOLATION) => Some(StoreError::ProbabilityOutOfRange(prediction.probability)),
        Some(PG_UNIQUE_VIOLATION) => Some(StoreError::DuplicateId(prediction.id)),
        _ => None,
    }
}

fn check_probability(probability: f64) -> Result<(), StoreError> {
    if (0.0..=1.0).contains(&probability) {
        Ok(())
    } else {
        Err(StoreError::ProbabilityOutOfRange(probability))
    }
}

// ============================================================================
// POSTGRES
// ============================================================================

#[derive(Clone)]
pub struct PgPredictionStore {
    pool: PgPool,
}

impl PgPredictionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn decode(rows: Vec<PredictionRow>) -> Result<Vec<Prediction>, StoreError> {
        rows.into_iter()
            .map(|r| Prediction::try_from(r).map_err(StoreError::from))
            .collect()
    }
}

#[async_trait]
impl PredictionStore for PgPredictionStore {
    async fn insert(&self, prediction: &Prediction) -> Result<(), StoreError> {
        let recommendation = serde_json::to_value(&prediction.recommendation)?;

        sqlx::query(
            r#"
            INSERT INTO predictions (id, run_id, signal_id, model_version, probability, recommendation, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#
        )
        .bind(prediction.id)
        .bind(&prediction.run_id)
        .bind(&prediction.signal_id)
        .bind(&prediction.model_version)
        .bind(prediction.probability)
        .bind(&recommendation)
        .bind(prediction.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let code = e.as_database_error().and_then(|d| d.code()).map(|c| c.into_owned());
            constraint_violation(code.as_deref(), prediction).unwrap_or(StoreError::Database(e))
        })?;

        Ok(())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Prediction>, StoreError> {
        let rows = sqlx::query_as::<_, PredictionRow>(
            r#"
            SELECT id, run_id, signal_id, model_version, probability, recommendation, created_at
            FROM predictions
            ORDER BY created_at DESC
            LIMIT $1
            "#
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        Self::decode(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Prediction>, StoreError> {
        let row = sqlx::query_as::<_, PredictionRow>(
            r#"
            SELECT id, run_id, signal_id, model_version, probability, recommendation, created_at
            FROM predictions
            WHERE id = $1
            "#
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Prediction::try_from).transpose()?)
    }

    async fn list_by_run(&self, run_id: &str, limit: i64) -> Result<Vec<Prediction>, StoreError> {
        let rows = sqlx::query_as::<_, PredictionRow>(
            r#"
            SELECT id, run_id, signal_id, model_version, probability, recommendation, created_at
            FROM predictions
            WHERE run_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#
        )
        .bind(run_id)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        Self::decode(rows)
    }
}

// ============================================================================
// IN-MEMORY
// ============================================================================

/// Rows kept in insertion order; reads sort newest first, later inserts
/// winning ties on `created_at`.
#[derive(Default)]
pub struct MemoryPredictionStore {
    rows: RwLock<Vec<Prediction>>,
}

impl MemoryPredictionStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    fn newest_first<F>(&self, limit: i64, keep: F) -> Vec<Prediction>
    where
        F: Fn(&Prediction) -> bool,
    {
        if limit <= 0 {
            return Vec::new();
        }
        let rows = self.rows.read();
        let mut matching: Vec<&Prediction> = rows.iter().rev().filter(|p| keep(p)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.into_iter().take(limit as usize).cloned().collect()
    }
}

#[async_trait]
impl PredictionStore for MemoryPredictionStore {
    async fn insert(&self, prediction: &Prediction) -> Result<(), StoreError> {
        check_probability(prediction.probability)?;

        let mut rows = self.rows.write();
        if rows.iter().any(|p| p.id == prediction.id) {
            return Err(StoreError::DuplicateId(prediction.id));
        }
        rows.push(prediction.clone());
        Ok(())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Prediction>, StoreError> {
        Ok(self.newest_first(limit, |_| true))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Prediction>, StoreError> {
        Ok(self.rows.read().iter().find(|p| p.id == id).cloned())
    }

    async fn list_by_run(&self, run_id: &str, limit: i64) -> Result<Vec<Prediction>, StoreError> {
        Ok(self.newest_first(limit, |p| p.run_id.as_deref() == Some(run_id)))
    }
}
