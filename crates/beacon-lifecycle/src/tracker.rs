//! The lifecycle tracker and its alert policy.
//!
//! Per-application records hold a cumulative registration counter
//! (never reset, drives the once-per-lifetime first-instance alert)
//! and a live-instance set (drives the last-instance alert on a
//! genuine `>0 → 0` transition). Records are independently
//! addressable, so contention is only possible within a single
//! application.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, info, warn};

use beacon_alert::{AlertSink, Severity};
use beacon_registry::LifecycleEvent;

/// Tuning for the tracker.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Application whose renewals get a liveness confirmation log line.
    pub watched_app: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            watched_app: "critical-service".to_string(),
        }
    }
}

/// Per-application bookkeeping. Entries persist for the process
/// lifetime; the live set may reach zero.
struct AppRecord {
    /// Registrations ever observed, never decremented.
    registrations: AtomicU64,
    /// Instances currently believed live. May transiently diverge from
    /// the registry's authoritative view between a cancellation and
    /// the next poll.
    live: Mutex<HashSet<String>>,
}

impl AppRecord {
    fn new() -> Self {
        Self {
            registrations: AtomicU64::new(0),
            live: Mutex::new(HashSet::new()),
        }
    }
}

/// Consumes lifecycle events and raises alerts on fleet-size
/// transitions.
pub struct LifecycleTracker {
    apps: RwLock<HashMap<String, Arc<AppRecord>>>,
    sink: Arc<dyn AlertSink>,
    config: TrackerConfig,
}

impl LifecycleTracker {
    pub fn new(sink: Arc<dyn AlertSink>, config: TrackerConfig) -> Self {
        Self {
            apps: RwLock::new(HashMap::new()),
            sink,
            config,
        }
    }

    /// Process one event. Safe to invoke concurrently, including for
    /// the same application; malformed events are dropped with a log
    /// line and never block subsequent events.
    pub fn handle(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::Registered {
                app_name,
                instance_id,
            } => {
                if app_name.is_empty() || instance_id.is_empty() {
                    warn!(?event, "dropping malformed registration event");
                    return;
                }
                self.on_registered(app_name, instance_id);
            }
            LifecycleEvent::Renewed { app_name } => {
                if app_name.is_empty() {
                    warn!(?event, "dropping malformed renewal event");
                    return;
                }
                self.on_renewed(app_name);
            }
            LifecycleEvent::Canceled {
                app_name,
                instance_id,
            } => {
                if app_name.is_empty() || instance_id.is_empty() {
                    warn!(?event, "dropping malformed cancellation event");
                    return;
                }
                self.on_canceled(app_name, instance_id);
            }
        }
    }

    fn on_registered(&self, app_name: &str, instance_id: &str) {
        let record = self.record_for(app_name);

        {
            let mut live = record.live.lock().unwrap_or_else(|e| e.into_inner());
            live.insert(instance_id.to_string());
        }

        // fetch_add hands the 0→1 transition to exactly one caller,
        // however many registrations race.
        let previous = record.registrations.fetch_add(1, Ordering::SeqCst);
        info!(app = %app_name, instance = %instance_id, "instance registered");

        if previous == 0 {
            self.alert(
                Severity::Info,
                "First instance registered",
                &format!("first instance of {app_name} registered: {instance_id}"),
            );
        }
    }

    fn on_renewed(&self, app_name: &str) {
        if app_name == self.config.watched_app {
            info!(app = %app_name, "watched application renewal received");
        } else {
            debug!(app = %app_name, "renewal received");
        }
    }

    fn on_canceled(&self, app_name: &str, instance_id: &str) {
        let record = {
            let apps = self.apps.read().unwrap_or_else(|e| e.into_inner());
            apps.get(app_name).cloned()
        };
        let Some(record) = record else {
            warn!(app = %app_name, instance = %instance_id, "cancellation for unknown application");
            return;
        };

        let last_instance_gone = {
            let mut live = record.live.lock().unwrap_or_else(|e| e.into_inner());
            if !live.remove(instance_id) {
                warn!(app = %app_name, instance = %instance_id, "cancellation for unknown instance");
                return;
            }
            live.is_empty()
        };

        warn!(app = %app_name, instance = %instance_id, "instance canceled");

        // Only the removal that empties the set fires, so concurrent
        // cancellations cannot storm.
        if last_instance_gone {
            self.alert(
                Severity::Critical,
                "Last instance canceled",
                &format!("last instance of {app_name} has been canceled: {instance_id}"),
            );
        }
    }

    /// Consume events from a channel until it closes or shutdown flips.
    pub async fn run(
        &self,
        mut events: tokio::sync::mpsc::Receiver<LifecycleEvent>,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        info!("lifecycle tracker started");
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => self.handle(&event),
                        None => {
                            info!("lifecycle event channel closed");
                            break;
                        }
                    }
                }
                _ = shutdown.changed() => {
                    info!("lifecycle tracker shutting down");
                    break;
                }
            }
        }
    }

    /// Registrations ever observed for an application.
    pub fn registration_count(&self, app_name: &str) -> u64 {
        let apps = self.apps.read().unwrap_or_else(|e| e.into_inner());
        apps.get(app_name)
            .map(|r| r.registrations.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Instances currently believed live for an application.
    pub fn live_count(&self, app_name: &str) -> u64 {
        let apps = self.apps.read().unwrap_or_else(|e| e.into_inner());
        apps.get(app_name)
            .map(|r| r.live.lock().unwrap_or_else(|e| e.into_inner()).len() as u64)
            .unwrap_or(0)
    }

    fn record_for(&self, app_name: &str) -> Arc<AppRecord> {
        {
            let apps = self.apps.read().unwrap_or_else(|e| e.into_inner());
            if let Some(record) = apps.get(app_name) {
                return record.clone();
            }
        }
        let mut apps = self.apps.write().unwrap_or_else(|e| e.into_inner());
        apps.entry(app_name.to_string())
            .or_insert_with(|| Arc::new(AppRecord::new()))
            .clone()
    }

    fn alert(&self, severity: Severity, title: &str, message: &str) {
        if let Err(e) = self.sink.send(severity, title, message) {
            warn!(error = %e, title, "alert delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_alert::MemoryAlertSink;

    fn tracker() -> (LifecycleTracker, Arc<MemoryAlertSink>) {
        let sink = Arc::new(MemoryAlertSink::new());
        let tracker = LifecycleTracker::new(sink.clone(), TrackerConfig::default());
        (tracker, sink)
    }

    fn registered(app: &str, instance: &str) -> LifecycleEvent {
        LifecycleEvent::Registered {
            app_name: app.to_string(),
            instance_id: instance.to_string(),
        }
    }

    fn canceled(app: &str, instance: &str) -> LifecycleEvent {
        LifecycleEvent::Canceled {
            app_name: app.to_string(),
            instance_id: instance.to_string(),
        }
    }

    #[test]
    fn first_registration_alerts_once() {
        let (tracker, sink) = tracker();

        tracker.handle(&registered("orders", "i-1"));
        assert_eq!(tracker.registration_count("orders"), 1);
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity, Severity::Info);
        assert!(records[0].message.contains("orders"));

        // Subsequent registrations do not alert again.
        tracker.handle(&registered("orders", "i-2"));
        tracker.handle(&registered("orders", "i-3"));
        assert_eq!(tracker.registration_count("orders"), 3);
        assert_eq!(sink.count(), 1);
    }

    #[test]
    fn each_application_gets_its_own_first_alert() {
        let (tracker, sink) = tracker();

        tracker.handle(&registered("orders", "i-1"));
        tracker.handle(&registered("payments", "i-1"));

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().any(|r| r.message.contains("payments")));
    }

    #[test]
    fn last_instance_cancellation_is_critical() {
        let (tracker, sink) = tracker();

        tracker.handle(&registered("orders", "i-1"));
        tracker.handle(&registered("orders", "i-2"));
        assert_eq!(tracker.live_count("orders"), 2);

        // Instances remain: no critical alert.
        tracker.handle(&canceled("orders", "i-1"));
        assert_eq!(tracker.live_count("orders"), 1);
        assert_eq!(sink.count(), 1); // only the first-instance alert

        // Last one gone: critical.
        tracker.handle(&canceled("orders", "i-2"));
        assert_eq!(tracker.live_count("orders"), 0);
        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].severity, Severity::Critical);
        assert!(records[1].title.contains("Last instance"));
    }

    #[test]
    fn duplicate_cancellation_does_not_refire() {
        let (tracker, sink) = tracker();

        tracker.handle(&registered("orders", "i-1"));
        tracker.handle(&canceled("orders", "i-1"));
        assert_eq!(sink.count(), 2);

        tracker.handle(&canceled("orders", "i-1"));
        assert_eq!(sink.count(), 2);
    }

    #[test]
    fn registration_after_drain_reuses_the_record() {
        let (tracker, sink) = tracker();

        tracker.handle(&registered("orders", "i-1"));
        tracker.handle(&canceled("orders", "i-1"));

        // The record persists with a zero live count.
        tracker.handle(&registered("orders", "i-2"));
        assert_eq!(tracker.registration_count("orders"), 2);
        assert_eq!(tracker.live_count("orders"), 1);

        // The first-instance alert stays once-per-lifetime.
        let infos = sink
            .records()
            .iter()
            .filter(|r| r.severity == Severity::Info)
            .count();
        assert_eq!(infos, 1);
    }

    #[test]
    fn cancellation_for_unknown_application_is_ignored() {
        let (tracker, sink) = tracker();
        tracker.handle(&canceled("ghost", "i-1"));
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn malformed_events_are_dropped() {
        let (tracker, sink) = tracker();

        tracker.handle(&registered("", "i-1"));
        tracker.handle(&registered("orders", ""));
        tracker.handle(&LifecycleEvent::Renewed {
            app_name: String::new(),
        });
        assert_eq!(tracker.registration_count("orders"), 0);
        assert_eq!(sink.count(), 0);

        // Processing continues afterwards.
        tracker.handle(&registered("orders", "i-1"));
        assert_eq!(tracker.registration_count("orders"), 1);
    }

    #[test]
    fn renewal_mutates_no_counters() {
        let (tracker, sink) = tracker();
        tracker.handle(&registered("critical-service", "i-1"));

        tracker.handle(&LifecycleEvent::Renewed {
            app_name: "critical-service".to_string(),
        });
        tracker.handle(&LifecycleEvent::Renewed {
            app_name: "orders".to_string(),
        });

        assert_eq!(tracker.registration_count("critical-service"), 1);
        assert_eq!(tracker.live_count("critical-service"), 1);
        assert_eq!(sink.count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_registrations_alert_exactly_once() {
        let sink = Arc::new(MemoryAlertSink::new());
        let tracker = Arc::new(LifecycleTracker::new(
            sink.clone(),
            TrackerConfig::default(),
        ));

        let n = 32;
        let handles: Vec<_> = (0..n)
            .map(|i| {
                let tracker = tracker.clone();
                tokio::spawn(async move {
                    tracker.handle(&LifecycleEvent::Registered {
                        app_name: "orders".to_string(),
                        instance_id: format!("i-{i}"),
                    });
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(tracker.registration_count("orders"), n);
        assert_eq!(tracker.live_count("orders"), n);
        assert_eq!(sink.count(), 1);
    }

    #[tokio::test]
    async fn run_drains_the_channel() {
        let sink = Arc::new(MemoryAlertSink::new());
        let tracker = Arc::new(LifecycleTracker::new(
            sink.clone(),
            TrackerConfig::default(),
        ));

        let (tx, rx) = tokio::sync::mpsc::channel(16);
        let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        let loop_tracker = tracker.clone();
        let handle = tokio::spawn(async move { loop_tracker.run(rx, shutdown_rx).await });

        tx.send(registered("orders", "i-1")).await.unwrap();
        tx.send(canceled("orders", "i-1")).await.unwrap();
        drop(tx); // closing the channel ends the loop
        handle.await.unwrap();

        assert_eq!(tracker.registration_count("orders"), 1);
        assert_eq!(sink.count(), 2);
    }
}
