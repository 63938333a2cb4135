//! beacon-preservation — registry-wide renewal health.
//!
//! Classifies the registry's self-preservation state from live renewal
//! statistics and reports it on a fixed cadence.
//!
//! # Architecture
//!
//! ```text
//! evaluate() → PreservationStatus        pure, never fails
//!
//! PreservationMonitor
//!   ├── run() → periodic evaluation loop
//!   ├── status_rx() → latest status for external inspection
//!   └── register_gauges() → renewal gauges on the shared board
//! ```

pub mod evaluator;
pub mod monitor;

pub use evaluator::{
    HealthTier, PreservationConfig, PreservationStatus, StatusLabel, evaluate,
};
pub use monitor::PreservationMonitor;
