//! Instance lifecycle events pushed by the registry.
//!
//! Delivery order for a single instance is registration before any
//! renewal or cancellation for that instance; there is no ordering
//! guarantee across different instances or applications.

use serde::{Deserialize, Serialize};

use crate::types::{AppName, InstanceId};

/// A discrete registry lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// An instance registered with the registry.
    Registered {
        app_name: AppName,
        instance_id: InstanceId,
    },
    /// An instance sent a heartbeat.
    Renewed { app_name: AppName },
    /// An instance was canceled (deregistered or evicted).
    Canceled {
        app_name: AppName,
        instance_id: InstanceId,
    },
}

impl LifecycleEvent {
    /// The application this event concerns.
    pub fn app_name(&self) -> &str {
        match self {
            LifecycleEvent::Registered { app_name, .. }
            | LifecycleEvent::Renewed { app_name }
            | LifecycleEvent::Canceled { app_name, .. } => app_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_tag_by_type() {
        let event = LifecycleEvent::Registered {
            app_name: "orders".to_string(),
            instance_id: "i-1".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"registered\""));

        let back: LifecycleEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn app_name_accessor() {
        let event = LifecycleEvent::Renewed {
            app_name: "payments".to_string(),
        };
        assert_eq!(event.app_name(), "payments");
    }
}
