//! beacon-registry — the contract between Beacon and the service registry.
//!
//! Beacon never implements registration or the heartbeat protocol itself;
//! it reads state the registry already computed. This crate holds the
//! read-only [`RegistrySource`] trait the monitors poll, the domain types
//! they exchange, the lifecycle events the registry pushes, and an
//! [`InMemoryRegistry`] used by tests and by the standalone daemon.
//!
//! # Architecture
//!
//! ```text
//! RegistrySource (trait)
//!   ├── renewal_threshold() / renewals_last_minute()
//!   ├── self_preservation_enabled()
//!   ├── list_applications() → Vec<AppView>
//!   └── peer_node_count()
//!
//! LifecycleEvent (pushed by the registry)
//!   └── Registered / Renewed / Canceled
//! ```

pub mod error;
pub mod events;
pub mod source;
pub mod types;

pub use error::{RegistryError, RegistryResult};
pub use events::LifecycleEvent;
pub use source::{InMemoryRegistry, RegistrySource, UnavailableRegistry};
pub use types::{AppView, InstanceStatus, InstanceView, RegistrySnapshot};
