//! beacond — the Beacon daemon.
//!
//! Single binary that assembles the observability subsystems around a
//! registry source:
//! - Gauge board + metrics aggregator
//! - Self-preservation monitor
//! - Lifecycle tracker + alert sink
//! - REST API + Prometheus exposition
//!
//! # Usage
//!
//! ```text
//! beacond standalone --port 8460 --metrics-interval 30
//! ```
//!
//! Standalone mode runs against the built-in in-memory registry;
//! lifecycle events posted to `/api/v1/events` are applied to it and
//! fed to the tracker.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, watch};
use tracing::info;

use beacon_alert::LogAlertSink;
use beacon_lifecycle::{LifecycleTracker, TrackerConfig};
use beacon_metrics::{AggregatorConfig, GaugeBoard, MetricsAggregator};
use beacon_preservation::{PreservationConfig, PreservationMonitor};
use beacon_registry::{InMemoryRegistry, InstanceStatus, LifecycleEvent};

#[derive(Parser)]
#[command(name = "beacond", about = "Beacon registry observability daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run against the built-in in-memory registry (all subsystems in one process).
    Standalone {
        /// Port to listen on.
        #[arg(long, default_value = "8460")]
        port: u16,

        /// Self-preservation evaluation interval in seconds.
        #[arg(long, default_value = "60")]
        preservation_interval: u64,

        /// Metrics poll interval in seconds.
        #[arg(long, default_value = "30")]
        metrics_interval: u64,

        /// Detailed report interval in seconds.
        #[arg(long, default_value = "600")]
        report_interval: u64,

        /// Renewal ratio below which the status is a warning.
        #[arg(long, default_value = "0.85")]
        warning_ratio: f64,

        /// Renewal ratio above which health is "good".
        #[arg(long, default_value = "0.95")]
        healthy_ratio: f64,

        /// Renewal ratio above which health is "excellent".
        #[arg(long, default_value = "1.2")]
        excellent_ratio: f64,

        /// Application whose renewals get a liveness confirmation log line.
        #[arg(long, default_value = "critical-service")]
        watched_app: String,

        /// Approximate bytes of registry state per instance.
        #[arg(long, default_value = "1024")]
        instance_size_estimate: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,beacond=debug,beacon=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Standalone {
            port,
            preservation_interval,
            metrics_interval,
            report_interval,
            warning_ratio,
            healthy_ratio,
            excellent_ratio,
            watched_app,
            instance_size_estimate,
        } => {
            run_standalone(StandaloneOptions {
                port,
                preservation_interval,
                metrics_interval,
                report_interval,
                warning_ratio,
                healthy_ratio,
                excellent_ratio,
                watched_app,
                instance_size_estimate,
            })
            .await
        }
    }
}

struct StandaloneOptions {
    port: u16,
    preservation_interval: u64,
    metrics_interval: u64,
    report_interval: u64,
    warning_ratio: f64,
    healthy_ratio: f64,
    excellent_ratio: f64,
    watched_app: String,
    instance_size_estimate: u64,
}

async fn run_standalone(opts: StandaloneOptions) -> anyhow::Result<()> {
    info!("beacon daemon starting in standalone mode");

    // ── Initialize subsystems ──────────────────────────────────

    let registry = Arc::new(InMemoryRegistry::new());
    info!("in-memory registry initialized");

    let board = Arc::new(GaugeBoard::new());

    let aggregator = Arc::new(MetricsAggregator::new(
        registry.clone(),
        board.clone(),
        AggregatorConfig {
            poll_interval: Duration::from_secs(opts.metrics_interval),
            instance_size_estimate: opts.instance_size_estimate,
        },
    ));
    aggregator.register_static_gauges();
    info!(interval = opts.metrics_interval, "metrics aggregator initialized");

    let monitor = Arc::new(PreservationMonitor::new(
        registry.clone(),
        PreservationConfig {
            poll_interval: Duration::from_secs(opts.preservation_interval),
            report_interval: Duration::from_secs(opts.report_interval),
            warning_ratio: opts.warning_ratio,
            healthy_ratio: opts.healthy_ratio,
            excellent_ratio: opts.excellent_ratio,
        },
    ));
    monitor.register_gauges(&board);
    let status_rx = monitor.status_rx();
    info!(
        interval = opts.preservation_interval,
        "self-preservation monitor initialized"
    );

    let tracker = Arc::new(LifecycleTracker::new(
        Arc::new(LogAlertSink),
        TrackerConfig {
            watched_app: opts.watched_app,
        },
    ));
    info!("lifecycle tracker initialized");

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let metrics_shutdown = shutdown_rx.clone();
    let monitor_shutdown = shutdown_rx.clone();
    let ingest_shutdown = shutdown_rx.clone();

    // ── Start background tasks ─────────────────────────────────

    let metrics_handle = tokio::spawn({
        let aggregator = aggregator.clone();
        async move { aggregator.run(metrics_shutdown).await }
    });

    let monitor_handle = tokio::spawn({
        let monitor = monitor.clone();
        async move { monitor.run(monitor_shutdown).await }
    });

    // Events posted to the API are applied to the in-memory registry
    // and handed to the tracker.
    let (events_tx, events_rx) = mpsc::channel::<LifecycleEvent>(256);
    let ingest_handle = tokio::spawn({
        let registry = registry.clone();
        let tracker = tracker.clone();
        async move { ingest_events(registry, tracker, events_rx, ingest_shutdown).await }
    });

    // ── Start API server ───────────────────────────────────────

    let router = beacon_api::build_router(beacon_api::ApiState {
        source: registry,
        board,
        status: status_rx,
        events: events_tx,
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], opts.port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    let _ = metrics_handle.await;
    let _ = monitor_handle.await;
    let _ = ingest_handle.await;

    info!("beacon daemon stopped");
    Ok(())
}

/// Apply posted events to the standalone registry and the tracker.
async fn ingest_events(
    registry: Arc<InMemoryRegistry>,
    tracker: Arc<LifecycleTracker>,
    mut events: mpsc::Receiver<LifecycleEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(event) => {
                        apply_to_registry(&registry, &event);
                        tracker.handle(&event);
                    }
                    None => break,
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

fn apply_to_registry(registry: &InMemoryRegistry, event: &LifecycleEvent) {
    match event {
        LifecycleEvent::Registered {
            app_name,
            instance_id,
        } => {
            registry.upsert_instance(app_name, instance_id, InstanceStatus::Up);
        }
        LifecycleEvent::Canceled {
            app_name,
            instance_id,
        } => {
            registry.remove_instance(app_name, instance_id);
        }
        // Renewal statistics are windowed by a real registry; the
        // standalone one leaves them to the write accessors.
        LifecycleEvent::Renewed { .. } => {}
    }
}
