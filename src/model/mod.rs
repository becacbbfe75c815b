//! Prediction Model
//!
//! Pure scoring pipeline: metrics → normalized features → logistic
//! probability → tiered recommendation. No I/O and no shared mutable state.
//!
//! ```text
//! MetricsSnapshot ──► FeatureVector ──► z = bias + Σ wᵢ·fᵢ ──► σ(z) ──► RiskLevel
//! ```

pub mod config;
pub mod features;
pub mod scoring;

pub use config::{ModelRegistry, LINEAR_V1};
pub use features::MetricsSnapshot;
pub use scoring::{Model, Recommendation};
