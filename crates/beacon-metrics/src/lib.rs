//! beacon-metrics — observability for the service registry.
//!
//! Turns registry state into a stable set of named numeric gauges with
//! idempotent registration, and renders them for scraping.
//!
//! # Architecture
//!
//! ```text
//! GaugeBoard
//!   ├── register(name, accessor) — exactly once per name
//!   └── sample() → Vec<(name, value)> at scrape/log time
//!
//! MetricsAggregator
//!   ├── register_static_gauges() — process-wide gauges at startup
//!   ├── poll_and_update() — lazy per-application gauges
//!   └── run() → periodic poll loop
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for /metrics
//! ```

pub mod aggregator;
pub mod gauges;
pub mod prometheus;

pub use aggregator::{AggregatorConfig, MetricsAggregator};
pub use gauges::{GaugeBoard, sanitize_metric_name};
pub use prometheus::render_prometheus;
