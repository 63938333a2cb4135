//! Self-preservation monitor — the periodic evaluation loop.
//!
//! Evaluates on a fixed delay, logs a one-line summary each cycle,
//! publishes the latest status on a watch channel, and emits an
//! expanded report on a coarser cadence. A failed cycle degrades to an
//! error status for that cycle only; the loop keeps ticking.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use beacon_metrics::GaugeBoard;
use beacon_registry::RegistrySource;

use crate::evaluator::{
    self, PreservationConfig, PreservationStatus, StatusLabel, evaluate,
};

/// Periodically evaluates registry renewal health.
pub struct PreservationMonitor {
    source: Arc<dyn RegistrySource>,
    config: PreservationConfig,
    status_tx: watch::Sender<PreservationStatus>,
}

impl PreservationMonitor {
    pub fn new(source: Arc<dyn RegistrySource>, config: PreservationConfig) -> Self {
        let (status_tx, _) = watch::channel(PreservationStatus::pending());
        Self {
            source,
            config,
            status_tx,
        }
    }

    /// Subscribe to the latest computed status, independent of the
    /// logging cadence.
    pub fn status_rx(&self) -> watch::Receiver<PreservationStatus> {
        self.status_tx.subscribe()
    }

    /// Register the renewal gauges on the shared board.
    ///
    /// Accessors re-read the source at export time and degrade to 0.0.
    pub fn register_gauges(&self, board: &GaugeBoard) {
        let source = self.source.clone();
        board.register("registry_renewal_threshold", move || {
            source.renewal_threshold().unwrap_or(0) as f64
        });

        let source = self.source.clone();
        board.register("registry_renewals_per_minute", move || {
            source.renewals_last_minute().unwrap_or(0) as f64
        });

        let source = self.source.clone();
        board.register("registry_self_preservation_ratio", move || {
            let threshold = source.renewal_threshold().unwrap_or(0);
            let current = source.renewals_last_minute().unwrap_or(0);
            evaluator::renewal_ratio(current, threshold)
        });

        info!("self-preservation gauges registered");
    }

    /// Evaluate once, log, and publish. Returns the computed status.
    pub fn tick(&self) -> PreservationStatus {
        let status = evaluate(self.source.as_ref(), &self.config);
        self.log_summary(&status);
        self.status_tx.send_replace(status.clone());
        status
    }

    /// Run the evaluation loop until the shutdown signal flips.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.poll_interval.as_secs(),
            "self-preservation monitor started"
        );

        loop {
            let status = self.tick();
            if is_report_tick(
                epoch_secs(),
                self.config.report_interval,
                self.config.poll_interval,
            ) {
                self.log_detailed_report(&status);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = shutdown.changed() => {
                    info!("self-preservation monitor shutting down");
                    break;
                }
            }
        }
    }

    fn log_summary(&self, status: &PreservationStatus) {
        let ratio = format!("{:.2}", status.ratio);
        match status.label {
            StatusLabel::Active => {
                warn!(
                    %ratio,
                    current = status.current,
                    threshold = status.threshold,
                    "self-preservation ACTIVE; instance expiration suspended"
                );
            }
            StatusLabel::Warning => {
                warn!(
                    %ratio,
                    current = status.current,
                    threshold = status.threshold,
                    "renewal ratio low; close to self-preservation activation"
                );
            }
            StatusLabel::Healthy => {
                debug!(
                    %ratio,
                    current = status.current,
                    threshold = status.threshold,
                    "self-preservation inactive"
                );
            }
            StatusLabel::Error => {
                error!(
                    error = status.error.as_deref().unwrap_or("unknown"),
                    "failed to read registry for self-preservation status"
                );
            }
        }
    }

    /// Expanded multi-line report, emitted every report interval.
    fn log_detailed_report(&self, status: &PreservationStatus) {
        info!("──────────── self-preservation report ────────────");
        info!(
            mode = if status.enabled { "ACTIVE" } else { "INACTIVE" },
            ratio = format_args!("{:.3}", status.ratio),
            renewals = format_args!("{}/{}", status.current, status.threshold),
            "current state"
        );
        if status.enabled {
            info!("instance expiration is disabled");
            info!("check network connectivity and service health");
        } else {
            let tier = evaluator::tier(status.ratio, &self.config);
            info!(health = tier.as_str(), "normal instance management");
        }
        info!("──────────────────────────────────────────────────");
    }
}

/// Whether the current cycle should emit the detailed report.
///
/// Time-modulo check tolerant of the poll period: fires on the cycle
/// whose tick lands inside the first poll window of each report period.
fn is_report_tick(now_secs: u64, report_interval: Duration, poll_interval: Duration) -> bool {
    let report = report_interval.as_secs();
    if report == 0 {
        return false;
    }
    now_secs % report < poll_interval.as_secs().max(1)
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
