//! Scoring - logistic failure probability and tiered recommendations

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::config::{ModelConfig, TierThresholds};
use super::features::{FeatureVector, MetricsSnapshot};

/// Beyond this magnitude `exp` leaves the f64 range
const EXP_LIMIT: f64 = 709.0;

/// Feature level at which a metric gets its own RCA hint
const SATURATION_LEVEL: f64 = 0.8;

// ============================================================================
// RISK TIERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Bucket a probability, evaluating thresholds high to low
    pub fn classify(probability: f64, thresholds: &TierThresholds) -> Self {
        if probability > thresholds.critical {
            RiskLevel::Critical
        } else if probability > thresholds.high {
            RiskLevel::High
        } else if probability > thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator-facing guidance attached to every prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub risk_level: RiskLevel,
    pub actions: Vec<String>,
    #[serde(default)]
    pub rca_hints: Vec<String>,
}

impl Recommendation {
    pub fn for_tier(risk_level: RiskLevel, features: &FeatureVector) -> Self {
        let actions: &[&str] = match risk_level {
            RiskLevel::Critical => &[
                "Page the on-call engineer immediately",
                "Shift traffic away from the affected instances",
                "Freeze deployments until the service stabilizes",
            ],
            RiskLevel::High => &[
                "Notify the on-call engineer",
                "Scale out the affected service",
                "Increase monitoring frequency",
            ],
            RiskLevel::Medium => &[
                "Monitor the service closely",
                "Review capacity headroom",
            ],
            RiskLevel::Low => &["Continue normal monitoring"],
        };

        let rca_hints = match risk_level {
            RiskLevel::High | RiskLevel::Critical => rca_hints(features),
            RiskLevel::Low | RiskLevel::Medium => Vec::new(),
        };

        Self {
            risk_level,
            actions: actions.iter().map(|a| a.to_string()).collect(),
            rca_hints,
        }
    }
}

fn rca_hints(features: &FeatureVector) -> Vec<String> {
    let mut hints: Vec<String> = features
        .saturated(SATURATION_LEVEL)
        .into_iter()
        .map(|name| match name {
            "cpu_usage" => "CPU saturation: look for hot loops or runaway workers",
            "memory_usage" => "Memory pressure: check for leaks and cache growth",
            "error_rate" => "Elevated error rate: inspect recent error logs and failing dependencies",
            "response_time" => "Slow responses: check downstream latency and connection pools",
            _ => "Saturated metric",
        })
        .map(String::from)
        .collect();

    hints.push("Correlate with recent deployments and configuration changes".to_string());
    hints
}

// ============================================================================
// MODEL
// ============================================================================

/// Numerically safe logistic function, always within [0, 1]
pub fn sigmoid(z: f64) -> f64 {
    if z.is_nan() {
        return 0.5;
    }
    if z < -EXP_LIMIT {
        return 0.0;
    }
    if z > EXP_LIMIT {
        return 1.0;
    }
    (1.0 / (1.0 + (-z).exp())).clamp(0.0, 1.0)
}

/// Result of one scoring call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelOutput {
    pub probability: f64,
    pub model_version: String,
    pub recommendation: Recommendation,
    pub features: FeatureVector,
}

/// Fixed-weight logistic failure model.
///
/// Immutable after construction; clones share the same configuration.
#[derive(Debug, Clone)]
pub struct Model {
    config: Arc<ModelConfig>,
}

impl Model {
    pub fn from_config(config: ModelConfig) -> Self {
        Self { config: Arc::new(config) }
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Linear score before the logistic transform
    pub fn logit(&self, features: &FeatureVector) -> f64 {
        self.config
            .weights
            .iter()
            .zip(features.as_array().iter())
            .fold(self.config.bias, |z, (w, f)| z + w * f)
    }

    /// Score a snapshot. Total: every input yields a probability in [0, 1].
    pub fn predict(&self, metrics: &MetricsSnapshot) -> ModelOutput {
        let features = FeatureVector::extract(metrics, &self.config.ceilings);
        let probability = sigmoid(self.logit(&features));
        let risk_level = RiskLevel::classify(probability, &self.config.thresholds);

        ModelOutput {
            probability,
            model_version: self.config.version.clone(),
            recommendation: Recommendation::for_tier(risk_level, &features),
            features,
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::from_config(ModelConfig::linear_v1())
    }
}
