//! The read-only snapshot source contract, plus an in-memory registry.
//!
//! The real registry lives outside this workspace; monitors only depend
//! on [`RegistrySource`]. [`InMemoryRegistry`] backs tests and the
//! standalone daemon.

use std::collections::BTreeMap;
use std::sync::RwLock;

use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::types::{AppView, InstanceStatus, InstanceView, RegistrySnapshot};

/// Read-only accessor to the registry state the monitors poll.
///
/// Every method returns a fresh read; implementations must not cache on
/// behalf of the caller. Errors mean the registry is unavailable or
/// returned partial data — callers degrade, never propagate.
pub trait RegistrySource: Send + Sync {
    /// Expected minimum renewals per minute before self-preservation engages.
    fn renewal_threshold(&self) -> RegistryResult<u64>;

    /// Renewals observed in the last minute.
    fn renewals_last_minute(&self) -> RegistryResult<u64>;

    /// Whether the registry is currently in self-preservation mode.
    fn self_preservation_enabled(&self) -> RegistryResult<bool>;

    /// Applications with their instances, in registry order.
    fn list_applications(&self) -> RegistryResult<Vec<AppView>>;

    /// Number of peer registry nodes in the replicated cluster.
    fn peer_node_count(&self) -> RegistryResult<u64>;

    /// Compose the individual reads into a single snapshot value.
    fn snapshot(&self) -> RegistryResult<RegistrySnapshot> {
        Ok(RegistrySnapshot {
            renewal_threshold: self.renewal_threshold()?,
            renewals_last_minute: self.renewals_last_minute()?,
            self_preservation_enabled: self.self_preservation_enabled()?,
            applications: self.list_applications()?,
            peer_node_count: self.peer_node_count()?,
        })
    }
}

#[derive(Default)]
struct RegistryInner {
    renewal_threshold: u64,
    renewals_last_minute: u64,
    self_preservation_enabled: bool,
    /// App name → instances. BTreeMap keeps registry order stable.
    applications: BTreeMap<String, Vec<InstanceView>>,
    peer_node_count: u64,
}

/// In-memory [`RegistrySource`] with write accessors.
///
/// Used by tests and by `beacond` in standalone mode, where lifecycle
/// events posted to the API are applied here.
#[derive(Default)]
pub struct InMemoryRegistry {
    inner: RwLock<RegistryInner>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_renewal_threshold(&self, threshold: u64) {
        self.write().renewal_threshold = threshold;
    }

    pub fn set_renewals_last_minute(&self, renewals: u64) {
        self.write().renewals_last_minute = renewals;
    }

    pub fn set_self_preservation(&self, enabled: bool) {
        self.write().self_preservation_enabled = enabled;
    }

    pub fn set_peer_node_count(&self, peers: u64) {
        self.write().peer_node_count = peers;
    }

    /// Record an instance, replacing any previous status for the same id.
    pub fn upsert_instance(&self, app_name: &str, instance_id: &str, status: InstanceStatus) {
        let mut inner = self.write();
        let instances = inner.applications.entry(app_name.to_string()).or_default();
        match instances.iter_mut().find(|i| i.id == instance_id) {
            Some(existing) => existing.status = status,
            None => instances.push(InstanceView {
                id: instance_id.to_string(),
                status,
            }),
        }
        debug!(app = %app_name, instance = %instance_id, status = status.key(), "instance recorded");
    }

    /// Remove an instance; drops the application once its last instance is gone.
    ///
    /// Returns whether the instance was present.
    pub fn remove_instance(&self, app_name: &str, instance_id: &str) -> bool {
        let mut inner = self.write();
        let Some(instances) = inner.applications.get_mut(app_name) else {
            return false;
        };
        let before = instances.len();
        instances.retain(|i| i.id != instance_id);
        let removed = instances.len() < before;
        if instances.is_empty() {
            inner.applications.remove(app_name);
        }
        if removed {
            debug!(app = %app_name, instance = %instance_id, "instance removed");
        }
        removed
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl RegistrySource for InMemoryRegistry {
    fn renewal_threshold(&self) -> RegistryResult<u64> {
        Ok(self.read().renewal_threshold)
    }

    fn renewals_last_minute(&self) -> RegistryResult<u64> {
        Ok(self.read().renewals_last_minute)
    }

    fn self_preservation_enabled(&self) -> RegistryResult<bool> {
        Ok(self.read().self_preservation_enabled)
    }

    fn list_applications(&self) -> RegistryResult<Vec<AppView>> {
        let inner = self.read();
        Ok(inner
            .applications
            .iter()
            .map(|(name, instances)| AppView {
                name: name.clone(),
                instances: instances.clone(),
            })
            .collect())
    }

    fn peer_node_count(&self) -> RegistryResult<u64> {
        Ok(self.read().peer_node_count)
    }
}

/// Source that fails every read, for exercising degradation paths.
pub struct UnavailableRegistry;

impl RegistrySource for UnavailableRegistry {
    fn renewal_threshold(&self) -> RegistryResult<u64> {
        Err(RegistryError::Unavailable("registry offline".to_string()))
    }

    fn renewals_last_minute(&self) -> RegistryResult<u64> {
        Err(RegistryError::Unavailable("registry offline".to_string()))
    }

    fn self_preservation_enabled(&self) -> RegistryResult<bool> {
        Err(RegistryError::Unavailable("registry offline".to_string()))
    }

    fn list_applications(&self) -> RegistryResult<Vec<AppView>> {
        Err(RegistryError::Unavailable("registry offline".to_string()))
    }

    fn peer_node_count(&self) -> RegistryResult<u64> {
        Err(RegistryError::Unavailable("registry offline".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_and_remove_instances() {
        let registry = InMemoryRegistry::new();
        registry.upsert_instance("orders", "i-1", InstanceStatus::Starting);
        registry.upsert_instance("orders", "i-1", InstanceStatus::Up);
        registry.upsert_instance("orders", "i-2", InstanceStatus::Up);

        let apps = registry.list_applications().unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].instance_count(), 2);
        assert_eq!(apps[0].count_with_status(InstanceStatus::Up), 2);

        assert!(registry.remove_instance("orders", "i-1"));
        assert!(!registry.remove_instance("orders", "i-1"));
        assert!(registry.remove_instance("orders", "i-2"));

        // Application disappears with its last instance.
        assert!(registry.list_applications().unwrap().is_empty());
    }

    #[test]
    fn applications_keep_stable_order() {
        let registry = InMemoryRegistry::new();
        registry.upsert_instance("zeta", "i-1", InstanceStatus::Up);
        registry.upsert_instance("alpha", "i-1", InstanceStatus::Up);

        let names: Vec<String> = registry
            .list_applications()
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn snapshot_composes_reads() {
        let registry = InMemoryRegistry::new();
        registry.set_renewal_threshold(10);
        registry.set_renewals_last_minute(9);
        registry.set_peer_node_count(2);
        registry.upsert_instance("orders", "i-1", InstanceStatus::Up);

        let snapshot = registry.snapshot().unwrap();
        assert_eq!(snapshot.renewal_threshold, 10);
        assert_eq!(snapshot.renewals_last_minute, 9);
        assert!(!snapshot.self_preservation_enabled);
        assert_eq!(snapshot.peer_node_count, 2);
        assert_eq!(snapshot.total_instances(), 1);
    }

    #[test]
    fn unavailable_registry_errors() {
        let err = UnavailableRegistry.snapshot().unwrap_err();
        assert!(matches!(err, RegistryError::Unavailable(_)));
    }
}
