//! Prometheus metrics for predictions
//!
//! The service talks to a `MetricsRecorder`; production wires in
//! `PrometheusMetrics`, tests can pass `NoopMetrics` or their own spy.

use prometheus::{
    register_counter_vec_with_registry, register_histogram_with_registry,
    CounterVec, Encoder, Histogram, Registry, TextEncoder,
};

/// Content type of the text exposition format
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub trait MetricsRecorder: Send + Sync {
    /// Count one recorded prediction
    fn record_prediction(&self, model_version: &str, risk_level: &str);

    /// Observe model + persistence latency
    fn observe_latency(&self, seconds: f64);

    /// Render for the `/metrics` endpoint
    fn render(&self) -> String;
}

#[derive(Clone)]
pub struct PrometheusMetrics {
    predictions_total: CounterVec,
    prediction_latency_seconds: Histogram,
    registry: Registry,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let predictions_total = register_counter_vec_with_registry!(
            "predictions_total",
            "Total number of recorded predictions by model version and risk level",
            &["model_version", "risk_level"],
            registry
        )?;

        let prediction_latency_seconds = register_histogram_with_registry!(
            "prediction_latency_seconds",
            "Time spent scoring and persisting a prediction",
            vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5],
            registry
        )?;

        Ok(Self {
            predictions_total,
            prediction_latency_seconds,
            registry,
        })
    }
}

impl MetricsRecorder for PrometheusMetrics {
    fn record_prediction(&self, model_version: &str, risk_level: &str) {
        self.predictions_total
            .with_label_values(&[model_version, risk_level])
            .inc();
    }

    fn observe_latency(&self, seconds: f64) {
        self.prediction_latency_seconds.observe(seconds);
    }

    fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Discards everything
#[cfg(test)]
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

#[cfg(test)]
impl MetricsRecorder for NoopMetrics {
    fn record_prediction(&self, _model_version: &str, _risk_level: &str) {}

    fn observe_latency(&self, _seconds: f64) {}

    fn render(&self) -> String {
        String::new()
    }
}
