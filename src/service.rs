//! Prediction Service
//!
//! Scores requests with the active model, records every prediction
//! durably and answers read-back queries. A prediction is reported as
//! successful only once its row is committed.

use std::sync::Arc;
use std::time::Instant;

use chrono::{SubsecRound, Utc};
use uuid::Uuid;

use crate::metrics::MetricsRecorder;
use crate::model::Model;
use crate::models::{PredictRequest, PredictResponse, Prediction};
use crate::store::{PredictionStore, StoreError};

/// Default page size for list queries
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Upper bound on any list query
pub const MAX_LIST_LIMIT: i64 = 1000;

pub struct PredictionService {
    model: Model,
    store: Arc<dyn PredictionStore>,
    metrics: Arc<dyn MetricsRecorder>,
    max_list_limit: i64,
}

impl PredictionService {
    pub fn new(model: Model, store: Arc<dyn PredictionStore>, metrics: Arc<dyn MetricsRecorder>) -> Self {
        Self {
            model,
            store,
            metrics,
            max_list_limit: MAX_LIST_LIMIT,
        }
    }

    pub fn with_max_list_limit(mut self, max: i64) -> Self {
        self.max_list_limit = max.max(1);
        self
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn metrics(&self) -> &dyn MetricsRecorder {
        self.metrics.as_ref()
    }

    /// Score, persist, then count. Nothing is counted or returned for a
    /// prediction whose write failed.
    pub async fn predict(&self, request: PredictRequest) -> Result<PredictResponse, StoreError> {
        let started = Instant::now();
        let metrics_data = request.metrics_data.unwrap_or_default();

        let output = self.model.predict(&metrics_data);
        let prediction = Prediction {
            id: Uuid::new_v4(),
            run_id: request.run_id,
            signal_id: request.signal_id,
            model_version: output.model_version,
            probability: output.probability,
            recommendation: output.recommendation,
            // TIMESTAMPTZ keeps microseconds; the response must match the stored row
            created_at: Utc::now().trunc_subsecs(6),
        };

        let result = self.store.insert(&prediction).await;
        self.metrics.observe_latency(started.elapsed().as_secs_f64());

        if let Err(e) = result {
            tracing::error!("Failed to record prediction {}: {}", prediction.id, e);
            return Err(e);
        }

        let risk_level = prediction.recommendation.risk_level;
        self.metrics.record_prediction(&prediction.model_version, risk_level.as_str());

        tracing::debug!(
            id = %prediction.id,
            model_version = %prediction.model_version,
            risk_level = %risk_level,
            probability = prediction.probability,
            "Prediction recorded"
        );

        Ok(PredictResponse::from(&prediction))
    }

    /// Most recent `limit` predictions, newest first
    pub async fn list(&self, limit: i64) -> Result<Vec<Prediction>, StoreError> {
        if limit <= 0 {
            return Ok(Vec::new());
        }
        self.store.list_recent(limit.min(self.max_list_limit)).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Prediction>, StoreError> {
        self.store.find_by_id(id).await
    }

    /// Predictions sharing a caller-supplied run id, newest first
    pub async fn list_by_run(&self, run_id: &str, limit: i64) -> Result<Vec<Prediction>, StoreError> {
        if limit <= 0 {
            return Ok(Vec::new());
        }
        self.store.list_by_run(run_id, limit.min(self.max_list_limit)).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::metrics::NoopMetrics;
    use crate::model::MetricsSnapshot;
    use crate::model::scoring::RiskLevel;
    use crate::store::MemoryPredictionStore;

    /// Store whose writes always fail
    pub(crate) struct FailingStore;

    #[async_trait]
    impl PredictionStore for FailingStore {
        async fn insert(&self, _prediction: &Prediction) -> Result<(), StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn list_recent(&self, _limit: i64) -> Result<Vec<Prediction>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn find_by_id(&self, _id: Uuid) -> Result<Option<Prediction>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn list_by_run(&self, _run_id: &str, _limit: i64) -> Result<Vec<Prediction>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    #[derive(Default)]
    pub(crate) struct SpyMetrics {
        pub recorded: Mutex<Vec<(String, String)>>,
        pub latencies: Mutex<Vec<f64>>,
    }

    impl MetricsRecorder for SpyMetrics {
        fn record_prediction(&self, model_version: &str, risk_level: &str) {
            self.recorded.lock().push((model_version.to_string(), risk_level.to_string()));
        }

        fn observe_latency(&self, seconds: f64) {
            self.latencies.lock().push(seconds);
        }

        fn render(&self) -> String {
            format!("spy_predictions {}", self.recorded.lock().len())
        }
    }

    fn service_with(store: Arc<dyn PredictionStore>, metrics: Arc<dyn MetricsRecorder>) -> PredictionService {
        PredictionService::new(Model::default(), store, metrics)
    }

    fn request(run_id: Option<&str>, metrics: MetricsSnapshot) -> PredictRequest {
        PredictRequest {
            run_id: run_id.map(String::from),
            signal_id: Some("sig-1".to_string()),
            metrics_data: Some(metrics),
        }
    }

    #[tokio::test]
    async fn test_predict_persists_and_round_trips() {
        let store = Arc::new(MemoryPredictionStore::new());
        let service = service_with(store.clone(), Arc::new(NoopMetrics));

        let response = service
            .predict(request(Some("run-1"), MetricsSnapshot::new(95.0, 90.0, 15.0, 800.0)))
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(response.model_version, "linear-v1");
        assert_eq!(response.recommendations.risk_level, RiskLevel::Medium);

        let listed = service.list(1).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, response.id);
        assert_eq!(listed[0].probability, response.probability);
        assert_eq!(listed[0].recommendation, response.recommendations);
        assert_eq!(listed[0].created_at, response.created_at);
        assert_eq!(listed[0].run_id.as_deref(), Some("run-1"));
        assert_eq!(listed[0].signal_id.as_deref(), Some("sig-1"));
    }

    #[tokio::test]
    async fn test_stored_probability_is_reproducible() {
        let store = Arc::new(MemoryPredictionStore::new());
        let service = service_with(store, Arc::new(NoopMetrics));
        let metrics = MetricsSnapshot::new(71.0, 12.0, 3.0, 420.0);

        let response = service.predict(request(None, metrics.clone())).await.unwrap();
        let stored = service.get(response.id).await.unwrap().unwrap();
        let rescored = service.model().predict(&metrics);

        assert_eq!(stored.probability.to_bits(), rescored.probability.to_bits());
        assert_eq!(stored.model_version, rescored.model_version);
    }

    #[tokio::test]
    async fn test_created_at_truncated_to_microseconds() {
        let service = service_with(Arc::new(MemoryPredictionStore::new()), Arc::new(NoopMetrics));
        for _ in 0..5 {
            let response = service.predict(PredictRequest::default()).await.unwrap();
            assert_eq!(response.created_at.timestamp_subsec_nanos() % 1_000, 0);

            let stored = service.get(response.id).await.unwrap().unwrap();
            assert_eq!(stored.created_at, response.created_at);
        }
    }

    #[tokio::test]
    async fn test_missing_metrics_scores_baseline() {
        let service = service_with(Arc::new(MemoryPredictionStore::new()), Arc::new(NoopMetrics));
        let response = service.predict(PredictRequest::default()).await.unwrap();
        assert!((response.probability - 0.49).abs() < 0.001);
        assert!(!response.recommendations.actions.is_empty());
    }

    #[tokio::test]
    async fn test_predict_fails_when_store_fails() {
        let spy = Arc::new(SpyMetrics::default());
        let service = service_with(Arc::new(FailingStore), spy.clone());

        let result = service.predict(PredictRequest::default()).await;
        assert!(matches!(result, Err(StoreError::Database(_))));
        assert!(spy.recorded.lock().is_empty());
        assert_eq!(spy.latencies.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_counts_by_version_and_tier() {
        let spy = Arc::new(SpyMetrics::default());
        let service = service_with(Arc::new(MemoryPredictionStore::new()), spy.clone());

        service.predict(request(None, MetricsSnapshot::new(100.0, 100.0, 100.0, 1000.0))).await.unwrap();
        service.predict(request(None, MetricsSnapshot::default())).await.unwrap();

        let recorded = spy.recorded.lock().clone();
        assert_eq!(
            recorded,
            vec![
                ("linear-v1".to_string(), "high".to_string()),
                ("linear-v1".to_string(), "medium".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_orders_newest_first() {
        let service = service_with(Arc::new(MemoryPredictionStore::new()), Arc::new(NoopMetrics));
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(service.predict(PredictRequest::default()).await.unwrap().id);
        }
        ids.reverse();

        let listed: Vec<Uuid> = service.list(3).await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_list_limits() {
        let service = service_with(Arc::new(MemoryPredictionStore::new()), Arc::new(NoopMetrics))
            .with_max_list_limit(2);
        assert!(service.list(DEFAULT_LIST_LIMIT).await.unwrap().is_empty());

        for _ in 0..3 {
            service.predict(PredictRequest::default()).await.unwrap();
        }
        assert!(service.list(0).await.unwrap().is_empty());
        assert!(service.list(-1).await.unwrap().is_empty());
        assert_eq!(service.list(1).await.unwrap().len(), 1);
        assert_eq!(service.list(100).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_non_positive_limit_skips_store() {
        let service = service_with(Arc::new(FailingStore), Arc::new(NoopMetrics));
        assert!(service.list(0).await.unwrap().is_empty());
        assert!(service.list_by_run("run", -2).await.unwrap().is_empty());
        assert!(service.list(1).await.is_err());
    }

    #[tokio::test]
    async fn test_list_by_run() {
        let service = service_with(Arc::new(MemoryPredictionStore::new()), Arc::new(NoopMetrics));
        let a = service.predict(request(Some("run-a"), MetricsSnapshot::default())).await.unwrap();
        service.predict(request(Some("run-b"), MetricsSnapshot::default())).await.unwrap();

        let rows = service.list_by_run("run-a", 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, a.id);
    }

    #[tokio::test]
    async fn test_concurrent_predictions_all_recorded() {
        let store = Arc::new(MemoryPredictionStore::new());
        let service = Arc::new(service_with(store.clone(), Arc::new(NoopMetrics)));

        let mut handles = Vec::new();
        for i in 0..16 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let cpu = i as f64 * 6.0;
                service
                    .predict(request(Some("load"), MetricsSnapshot::new(cpu, 50.0, 1.0, 200.0)))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.len(), 16);
        assert_eq!(service.list_by_run("load", 100).await.unwrap().len(), 16);
    }
}
