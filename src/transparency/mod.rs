//! What the shield reports back to the host.
//!
//! A live event stream for reacting to individual actions, and aggregate
//! audit counters for display.

pub mod events;
pub mod log;

pub use events::{EventSink, ShieldEvent, ShieldEventKind, EVENT_CHANNEL_CAPACITY};
pub use log::{create_shared_log, AuditLog, AuditStats, SharedAuditLog};
