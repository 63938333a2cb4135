//! Metrics aggregator — polls the registry and keeps the gauge board
//! populated.
//!
//! Static process-wide gauges are registered once at startup; per-
//! application gauges are registered lazily the first time an
//! application is seen. All accessors re-read the registry at export
//! time and degrade to 0.0 when it is unavailable, so a metrics-read
//! failure never interrupts export.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use beacon_registry::{AppView, InstanceStatus, RegistrySource};

use crate::gauges::GaugeBoard;

/// Tuning for the aggregator.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// How often to poll the registry for new applications.
    pub poll_interval: Duration,
    /// Approximate bytes of registry state per instance. The size gauge
    /// is directional, not authoritative.
    pub instance_size_estimate: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            instance_size_estimate: 1024,
        }
    }
}

/// Exposes registry state as named gauges on a shared [`GaugeBoard`].
pub struct MetricsAggregator {
    source: Arc<dyn RegistrySource>,
    board: Arc<GaugeBoard>,
    config: AggregatorConfig,
}

impl MetricsAggregator {
    pub fn new(
        source: Arc<dyn RegistrySource>,
        board: Arc<GaugeBoard>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            source,
            board,
            config,
        }
    }

    /// Register the fixed set of process-wide gauges.
    ///
    /// Called once at startup. Each accessor catches its own source
    /// error and reports 0.0 instead.
    pub fn register_static_gauges(&self) {
        let estimate = self.config.instance_size_estimate;

        let source = self.source.clone();
        self.board.register("registry_size_bytes", move || {
            registry_size_bytes(source.as_ref(), estimate)
        });

        let source = self.source.clone();
        self.board.register("registry_peer_nodes_total", move || {
            source.peer_node_count().unwrap_or(0) as f64
        });

        let source = self.source.clone();
        self.board.register("registry_applications_total", move || {
            application_count(source.as_ref())
        });

        let source = self.source.clone();
        self.board.register("registry_instances_total", move || {
            instance_count(source.as_ref())
        });

        self.board
            .register("registry_memory_utilization_ratio", memory_utilization);

        info!("static registry gauges registered");
    }

    /// Discover applications and register their gauges lazily.
    ///
    /// A failure to list applications skips per-application work for
    /// this cycle only; static gauges are unaffected. A single bad
    /// application never aborts collection for the rest.
    pub fn poll_and_update(&self) -> anyhow::Result<()> {
        let apps = match self.source.list_applications() {
            Ok(apps) => apps,
            Err(e) => {
                warn!(error = %e, "skipping per-application metrics for this cycle");
                return Ok(());
            }
        };

        for app in &apps {
            if let Err(e) = self.collect_app(app) {
                warn!(app = %app.name, error = %e, "failed to collect application metrics");
            }
        }
        Ok(())
    }

    /// Register per-status gauges for one application and log its counts.
    fn collect_app(&self, app: &AppView) -> anyhow::Result<()> {
        if app.name.is_empty() {
            anyhow::bail!("application with empty name");
        }

        for status in [InstanceStatus::Up, InstanceStatus::Down] {
            let name = format!("app_instances_{}_{}", status.key(), app.name);
            if self.board.is_registered(&name) {
                continue;
            }
            let source = self.source.clone();
            let app_name = app.name.clone();
            self.board.register(&name, move || {
                app_status_count(source.as_ref(), &app_name, status)
            });
        }

        debug!(
            app = %app.name,
            up = app.count_with_status(InstanceStatus::Up),
            down = app.count_with_status(InstanceStatus::Down),
            starting = app.count_with_status(InstanceStatus::Starting),
            out_of_service = app.count_with_status(InstanceStatus::OutOfService),
            "application instance counts"
        );
        Ok(())
    }

    /// One human-readable line combining the aggregate gauges.
    pub fn log_summary(&self) {
        let size_kb = registry_size_bytes(self.source.as_ref(), self.config.instance_size_estimate)
            as u64
            / 1024;
        let peers = self.source.peer_node_count().unwrap_or(0);
        let apps = application_count(self.source.as_ref()) as u64;
        let instances = instance_count(self.source.as_ref()) as u64;
        let memory_pct = memory_utilization() * 100.0;

        info!(
            registry_kb = size_kb,
            peers,
            applications = apps,
            instances,
            memory_pct = format_args!("{memory_pct:.1}"),
            "registry metrics summary"
        );
    }

    /// Run the poll loop until the shutdown signal flips.
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.poll_interval.as_secs(),
            "metrics aggregator started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {
                    if let Err(e) = self.poll_and_update() {
                        warn!(error = %e, "metrics poll failed");
                    }
                    self.log_summary();
                }
                _ = shutdown.changed() => {
                    info!("metrics aggregator shutting down");
                    break;
                }
            }
        }
    }
}

fn registry_size_bytes(source: &dyn RegistrySource, per_instance: u64) -> f64 {
    source
        .list_applications()
        .map(|apps| {
            apps.iter().map(AppView::instance_count).sum::<u64>() * per_instance
        })
        .unwrap_or(0) as f64
}

fn application_count(source: &dyn RegistrySource) -> f64 {
    source.list_applications().map(|apps| apps.len() as u64).unwrap_or(0) as f64
}

fn instance_count(source: &dyn RegistrySource) -> f64 {
    source
        .list_applications()
        .map(|apps| apps.iter().map(AppView::instance_count).sum::<u64>())
        .unwrap_or(0) as f64
}

fn app_status_count(source: &dyn RegistrySource, app_name: &str, status: InstanceStatus) -> f64 {
    source
        .list_applications()
        .ok()
        .and_then(|apps| apps.into_iter().find(|a| a.name == app_name))
        .map(|a| a.count_with_status(status) as f64)
        .unwrap_or(0.0)
}

/// Used / total memory of the host, 0.0 when the total is unknown.
fn memory_utilization() -> f64 {
    let mut system = sysinfo::System::new();
    system.refresh_memory();
    let total = system.total_memory();
    if total == 0 {
        return 0.0;
    }
    system.used_memory() as f64 / total as f64
}
