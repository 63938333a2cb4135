//! beacon-alert — alert severity and the delivery sink contract.
//!
//! The monitors only decide severity, title, and message; delivery
//! (email, chat, SMS, paging) is the sink's concern and lives outside
//! this workspace. Sink failures are never fatal — callers log and move
//! on.

pub mod sink;

pub use sink::{AlertError, AlertRecord, AlertSink, LogAlertSink, MemoryAlertSink, Severity};
