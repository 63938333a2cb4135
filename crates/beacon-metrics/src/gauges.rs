//! The gauge board — a name → accessor mapping with write-once names.
//!
//! A gauge is a zero-argument closure that re-reads current state on
//! every export. Registration is rare relative to reads, so a single
//! lock serializes the check-and-set; once a name is registered it is
//! never replaced for the process lifetime.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

/// Accessor producing the current value of a gauge.
pub type GaugeFn = Arc<dyn Fn() -> f64 + Send + Sync>;

/// Replace every character outside `[A-Za-z0-9_]` with `_` and lowercase.
pub fn sanitize_metric_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Shared registry of named gauges.
#[derive(Default)]
pub struct GaugeBoard {
    gauges: RwLock<HashMap<String, GaugeFn>>,
}

impl GaugeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an accessor under a sanitized name.
    ///
    /// Returns `true` if the gauge was registered, `false` if the name
    /// was already taken — in which case the existing accessor stays
    /// live and the call is a no-op.
    pub fn register<F>(&self, name: &str, accessor: F) -> bool
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        let name = sanitize_metric_name(name);
        let mut gauges = self.gauges.write().unwrap_or_else(|e| e.into_inner());
        if gauges.contains_key(&name) {
            return false;
        }
        debug!(gauge = %name, "gauge registered");
        gauges.insert(name, Arc::new(accessor));
        true
    }

    /// Whether a gauge is registered under this (sanitized) name.
    pub fn is_registered(&self, name: &str) -> bool {
        let name = sanitize_metric_name(name);
        self.gauges
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&name)
    }

    /// Number of registered gauges.
    pub fn len(&self) -> usize {
        self.gauges.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evaluate every gauge, sorted by name.
    pub fn sample(&self) -> Vec<(String, f64)> {
        let gauges = self.gauges.read().unwrap_or_else(|e| e.into_inner());
        let mut samples: Vec<(String, f64)> = gauges
            .iter()
            .map(|(name, accessor)| (name.clone(), accessor()))
            .collect();
        drop(gauges);
        samples.sort_by(|a, b| a.0.cmp(&b.0));
        samples
    }

    /// Current value of a single gauge, if registered.
    pub fn value(&self, name: &str) -> Option<f64> {
        let name = sanitize_metric_name(name);
        let gauges = self.gauges.read().unwrap_or_else(|e| e.into_inner());
        gauges.get(&name).map(|accessor| accessor())
    }
}
