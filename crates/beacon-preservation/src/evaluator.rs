//! Renewal ratio evaluation and status classification.
//!
//! Classification is a pure function of `(enabled, ratio)`. A source
//! failure degrades to an `Error`-labeled status with the error text
//! preserved; nothing in this module can fail or panic.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use beacon_registry::RegistrySource;

/// Tuning for evaluation and reporting.
#[derive(Debug, Clone)]
pub struct PreservationConfig {
    /// How often to evaluate and log.
    pub poll_interval: Duration,
    /// How often to emit the expanded multi-line report.
    pub report_interval: Duration,
    /// Below this ratio the registry is close to self-preservation.
    pub warning_ratio: f64,
    /// Above this ratio health is "good".
    pub healthy_ratio: f64,
    /// Above this ratio health is "excellent".
    pub excellent_ratio: f64,
}

impl Default for PreservationConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            report_interval: Duration::from_secs(600),
            warning_ratio: 0.85,
            healthy_ratio: 0.95,
            excellent_ratio: 1.2,
        }
    }
}

/// Classified self-preservation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLabel {
    /// Protection mode on; no instance expiration.
    Active,
    /// Approaching the self-preservation threshold.
    Warning,
    /// Normal operation.
    Healthy,
    /// The registry could not be read this cycle.
    Error,
}

impl StatusLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLabel::Active => "active",
            StatusLabel::Warning => "warning",
            StatusLabel::Healthy => "healthy",
            StatusLabel::Error => "error",
        }
    }
}

/// Qualitative tier reported while self-preservation is inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthTier {
    Excellent,
    Good,
    Caution,
}

impl HealthTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthTier::Excellent => "excellent",
            HealthTier::Good => "good",
            HealthTier::Caution => "caution",
        }
    }
}

/// Point-in-time self-preservation status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreservationStatus {
    pub enabled: bool,
    pub threshold: u64,
    pub current: u64,
    pub ratio: f64,
    pub label: StatusLabel,
    /// Error text when `label == Error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PreservationStatus {
    /// Placeholder published before the first evaluation completes.
    pub fn pending() -> Self {
        Self {
            enabled: false,
            threshold: 0,
            current: 0,
            ratio: 0.0,
            label: StatusLabel::Error,
            error: Some("no evaluation yet".to_string()),
        }
    }

    fn unavailable(error: String) -> Self {
        Self {
            enabled: false,
            threshold: 0,
            current: 0,
            ratio: 0.0,
            label: StatusLabel::Error,
            error: Some(error),
        }
    }
}

/// `current / threshold`, or 0.0 when the threshold is not positive.
pub fn renewal_ratio(current: u64, threshold: u64) -> f64 {
    if threshold > 0 {
        current as f64 / threshold as f64
    } else {
        0.0
    }
}

/// Classify `(enabled, ratio)` in precedence order.
pub fn classify(enabled: bool, ratio: f64, config: &PreservationConfig) -> StatusLabel {
    if enabled {
        StatusLabel::Active
    } else if ratio < config.warning_ratio {
        StatusLabel::Warning
    } else {
        StatusLabel::Healthy
    }
}

/// Qualitative tier for an inactive registry.
pub fn tier(ratio: f64, config: &PreservationConfig) -> HealthTier {
    if ratio > config.excellent_ratio {
        HealthTier::Excellent
    } else if ratio > config.healthy_ratio {
        HealthTier::Good
    } else {
        HealthTier::Caution
    }
}

/// Evaluate the registry's current self-preservation status.
///
/// Any failure to read the source yields a zeroed status with
/// `StatusLabel::Error` and the error text preserved for diagnostics.
pub fn evaluate(source: &dyn RegistrySource, config: &PreservationConfig) -> PreservationStatus {
    let enabled = match source.self_preservation_enabled() {
        Ok(v) => v,
        Err(e) => return PreservationStatus::unavailable(e.to_string()),
    };
    let threshold = match source.renewal_threshold() {
        Ok(v) => v,
        Err(e) => return PreservationStatus::unavailable(e.to_string()),
    };
    let current = match source.renewals_last_minute() {
        Ok(v) => v,
        Err(e) => return PreservationStatus::unavailable(e.to_string()),
    };

    let ratio = renewal_ratio(current, threshold);
    PreservationStatus {
        enabled,
        threshold,
        current,
        ratio,
        label: classify(enabled, ratio, config),
        error: None,
    }
}
