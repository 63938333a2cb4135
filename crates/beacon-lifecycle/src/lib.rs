//! beacon-lifecycle — reacts to instance lifecycle events.
//!
//! Maintains per-application registration counters and live-instance
//! sets, and enforces the alerting policy on fleet-size transitions:
//! an `Info` alert on an application's first-ever registration and a
//! `Critical` alert when its last live instance is canceled.
//!
//! # Architecture
//!
//! ```text
//! LifecycleTracker
//!   ├── handle(event) — safe under concurrent delivery
//!   ├── run(rx) → mpsc-driven event loop
//!   └── AlertSink ← first-instance / last-instance alerts
//! ```

pub mod tracker;

pub use tracker::{LifecycleTracker, TrackerConfig};
