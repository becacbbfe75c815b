//! Model Configuration
//!
//! Versioned weight sets. Every score is tagged with the version of the
//! configuration that produced it, so changing any constant here means
//! registering a new version rather than editing an existing one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::features::FEATURE_COUNT;

/// Version tag of the built-in linear model
pub const LINEAR_V1: &str = "linear-v1";

/// Tier cut-offs, compared with strict `>` from the top down
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            critical: 0.8,
            high: 0.6,
            medium: 0.3,
        }
    }
}

/// Fixed-weight logistic model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub version: String,
    /// Weights in `FEATURE_LAYOUT` order
    pub weights: [f64; FEATURE_COUNT],
    pub bias: f64,
    /// Domain ceiling used to normalize each raw metric
    pub ceilings: [f64; FEATURE_COUNT],
    pub thresholds: TierThresholds,
}

impl ModelConfig {
    /// The original fixed-weight model
    pub fn linear_v1() -> Self {
        Self {
            version: LINEAR_V1.to_string(),
            weights: [0.3, 0.3, 0.3, 0.1],
            bias: -0.5,
            ceilings: [100.0, 100.0, 100.0, 1000.0],
            thresholds: TierThresholds::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelConfigError> {
        if self.version.trim().is_empty() {
            return Err(ModelConfigError::EmptyVersion);
        }
        if !self.bias.is_finite() {
            return Err(ModelConfigError::NonFinite("bias"));
        }
        for (i, w) in self.weights.iter().enumerate() {
            if !w.is_finite() {
                return Err(ModelConfigError::NonFinite("weights"));
            }
            // Non-negative weights keep scores monotonic in every feature
            if *w < 0.0 {
                return Err(ModelConfigError::NegativeWeight { index: i, weight: *w });
            }
        }
        for (i, c) in self.ceilings.iter().enumerate() {
            if !c.is_finite() || *c <= 0.0 {
                return Err(ModelConfigError::InvalidCeiling { index: i, ceiling: *c });
            }
        }
        let t = &self.thresholds;
        let ordered = t.critical > t.high && t.high > t.medium;
        let bounded = [t.critical, t.high, t.medium]
            .iter()
            .all(|v| (0.0..=1.0).contains(v));
        if !ordered || !bounded {
            return Err(ModelConfigError::InvalidThresholds(*t));
        }
        Ok(())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::linear_v1()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ModelConfigError {
    #[error("model version must not be empty")]
    EmptyVersion,
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
    #[error("weight {index} is negative ({weight})")]
    NegativeWeight { index: usize, weight: f64 },
    #[error("ceiling {index} must be positive ({ceiling})")]
    InvalidCeiling { index: usize, ceiling: f64 },
    #[error("thresholds must satisfy 1 >= critical > high > medium >= 0, got {0:?}")]
    InvalidThresholds(TierThresholds),
    #[error("model version {0} is already registered")]
    DuplicateVersion(String),
    #[error("unknown model version: {0}")]
    UnknownVersion(String),
}

/// Known model configurations, keyed by version
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    configs: BTreeMap<String, ModelConfig>,
}

impl ModelRegistry {
    pub fn empty() -> Self {
        Self { configs: BTreeMap::new() }
    }

    /// Registry preloaded with every built-in version, each validated
    pub fn builtin() -> Result<Self, ModelConfigError> {
        let mut registry = Self::empty();
        registry.register(ModelConfig::linear_v1())?;
        Ok(registry)
    }

    pub fn register(&mut self, config: ModelConfig) -> Result<(), ModelConfigError> {
        config.validate()?;
        if self.configs.contains_key(&config.version) {
            return Err(ModelConfigError::DuplicateVersion(config.version));
        }
        self.configs.insert(config.version.clone(), config);
        Ok(())
    }

    pub fn get(&self, version: &str) -> Result<&ModelConfig, ModelConfigError> {
        self.configs
            .get(version)
            .ok_or_else(|| ModelConfigError::UnknownVersion(version.to_string()))
    }

    pub fn versions(&self) -> Vec<&str> {
        self.configs.keys().map(String::as_str).collect()
    }
}
