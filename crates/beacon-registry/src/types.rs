//! Domain types for the registry contract.
//!
//! These are the read-only views the registry exposes to the monitors.
//! A [`RegistrySnapshot`] is fetched fresh on each poll and never mutated,
//! only replaced.

use serde::{Deserialize, Serialize};

/// Application name as the registry reports it.
pub type AppName = String;

/// Unique identifier for an instance within an application.
pub type InstanceId = String;

// ── Instances ─────────────────────────────────────────────────────

/// Lifecycle status of a registered service instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Up,
    Down,
    Starting,
    OutOfService,
    Unknown,
}

impl InstanceStatus {
    /// All statuses, in reporting order.
    pub const ALL: [InstanceStatus; 5] = [
        InstanceStatus::Up,
        InstanceStatus::Down,
        InstanceStatus::Starting,
        InstanceStatus::OutOfService,
        InstanceStatus::Unknown,
    ];

    /// Stable lowercase key for metric names and log fields.
    pub fn key(&self) -> &'static str {
        match self {
            InstanceStatus::Up => "up",
            InstanceStatus::Down => "down",
            InstanceStatus::Starting => "starting",
            InstanceStatus::OutOfService => "out_of_service",
            InstanceStatus::Unknown => "unknown",
        }
    }
}

/// Read-only view of a single registered instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceView {
    pub id: InstanceId,
    pub status: InstanceStatus,
}

// ── Applications ──────────────────────────────────────────────────

/// Read-only view of an application and its registered instances.
///
/// Each instance contributes to exactly one status bucket, so the
/// per-status counts partition the instance list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppView {
    pub name: AppName,
    pub instances: Vec<InstanceView>,
}

impl AppView {
    /// Count instances currently in the given status.
    pub fn count_with_status(&self, status: InstanceStatus) -> u64 {
        self.instances.iter().filter(|i| i.status == status).count() as u64
    }

    /// Total registered instances regardless of status.
    pub fn instance_count(&self) -> u64 {
        self.instances.len() as u64
    }
}

// ── Snapshot ──────────────────────────────────────────────────────

/// Point-in-time view of the whole registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Expected minimum renewals per minute before self-preservation engages.
    pub renewal_threshold: u64,
    /// Renewals observed in the last minute.
    pub renewals_last_minute: u64,
    /// Whether the registry is currently in self-preservation mode.
    pub self_preservation_enabled: bool,
    /// Applications in registry order.
    pub applications: Vec<AppView>,
    /// Other registry instances in the replicated cluster.
    pub peer_node_count: u64,
}

impl RegistrySnapshot {
    /// Number of registered applications.
    pub fn application_count(&self) -> u64 {
        self.applications.len() as u64
    }

    /// Total instances across all applications.
    pub fn total_instances(&self) -> u64 {
        self.applications.iter().map(AppView::instance_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(name: &str, statuses: &[InstanceStatus]) -> AppView {
        AppView {
            name: name.to_string(),
            instances: statuses
                .iter()
                .enumerate()
                .map(|(i, s)| InstanceView {
                    id: format!("i-{i}"),
                    status: *s,
                })
                .collect(),
        }
    }

    #[test]
    fn status_counts_partition_instances() {
        let view = app(
            "orders",
            &[
                InstanceStatus::Up,
                InstanceStatus::Up,
                InstanceStatus::Down,
                InstanceStatus::Starting,
            ],
        );

        assert_eq!(view.count_with_status(InstanceStatus::Up), 2);
        assert_eq!(view.count_with_status(InstanceStatus::Down), 1);
        assert_eq!(view.count_with_status(InstanceStatus::Starting), 1);
        assert_eq!(view.count_with_status(InstanceStatus::OutOfService), 0);

        let total: u64 = InstanceStatus::ALL
            .iter()
            .map(|s| view.count_with_status(*s))
            .sum();
        assert_eq!(total, view.instance_count());
    }

    #[test]
    fn snapshot_totals() {
        let snapshot = RegistrySnapshot {
            renewal_threshold: 10,
            renewals_last_minute: 9,
            self_preservation_enabled: false,
            applications: vec![
                app("orders", &[InstanceStatus::Up, InstanceStatus::Up]),
                app("payments", &[InstanceStatus::Down]),
            ],
            peer_node_count: 2,
        };

        assert_eq!(snapshot.application_count(), 2);
        assert_eq!(snapshot.total_instances(), 3);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&InstanceStatus::OutOfService).unwrap();
        assert_eq!(json, "\"out_of_service\"");
    }
}
