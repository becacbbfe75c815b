//! Feature Extraction
//!
//! Turns a raw `MetricsSnapshot` into the fixed 4-slot feature vector
//! consumed by the scorer. Slot order is part of the model contract.

use serde::{Deserialize, Serialize};

// ============================================================================
// LAYOUT
// ============================================================================

/// Number of features fed to the model
pub const FEATURE_COUNT: usize = 4;

/// Feature names in vector order. Weights are positionally coupled to this.
pub const FEATURE_LAYOUT: [&str; FEATURE_COUNT] = [
    "cpu_usage",
    "memory_usage",
    "error_rate",
    "response_time",
];

pub const DEFAULT_CPU_USAGE_PERCENT: f64 = 50.0;
pub const DEFAULT_MEMORY_USAGE_PERCENT: f64 = 50.0;
pub const DEFAULT_ERROR_RATE: f64 = 50.0;
pub const DEFAULT_RESPONSE_TIME_MS: f64 = 100.0;

// ============================================================================
// INPUT
// ============================================================================

/// Operational metrics submitted for scoring.
///
/// Every field is optional. Absent or non-finite values fall back to the
/// documented midpoint defaults, so any snapshot (including `{}`) scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_usage_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_usage_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<f64>,
}

impl MetricsSnapshot {
    pub fn new(cpu: f64, memory: f64, error_rate: f64, response_time_ms: f64) -> Self {
        Self {
            cpu_usage_percent: Some(cpu),
            memory_usage_percent: Some(memory),
            error_rate: Some(error_rate),
            response_time_ms: Some(response_time_ms),
        }
    }

    /// Raw values in feature order, defaults applied
    pub fn raw_values(&self) -> [f64; FEATURE_COUNT] {
        [
            or_default(self.cpu_usage_percent, DEFAULT_CPU_USAGE_PERCENT),
            or_default(self.memory_usage_percent, DEFAULT_MEMORY_USAGE_PERCENT),
            or_default(self.error_rate, DEFAULT_ERROR_RATE),
            or_default(self.response_time_ms, DEFAULT_RESPONSE_TIME_MS),
        ]
    }
}

fn or_default(value: Option<f64>, default: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => default,
    }
}

// ============================================================================
// FEATURE VECTOR
// ============================================================================

/// Normalized features, each in [0.0, 1.0]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    /// Divide each raw metric by its ceiling and clamp into [0, 1].
    ///
    /// Negative readings floor to 0.0.
    pub fn extract(metrics: &MetricsSnapshot, ceilings: &[f64; FEATURE_COUNT]) -> Self {
        let raw = metrics.raw_values();
        let mut values = [0.0; FEATURE_COUNT];
        for (i, slot) in values.iter_mut().enumerate() {
            *slot = (raw[i] / ceilings[i]).clamp(0.0, 1.0);
        }
        Self(values)
    }

    pub fn as_array(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    /// Get feature by name
    pub fn get_by_name(&self, name: &str) -> Option<f64> {
        FEATURE_LAYOUT
            .iter()
            .position(|n| *n == name)
            .map(|i| self.0[i])
    }

    /// Names of features at or above `level`, in layout order
    pub fn saturated(&self, level: f64) -> Vec<&'static str> {
        FEATURE_LAYOUT
            .iter()
            .zip(self.0.iter())
            .filter(|(_, v)| **v >= level)
            .map(|(name, _)| *name)
            .collect()
    }
}
