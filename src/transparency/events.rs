//! Event stream from the shield to the host.

use crate::controller::Trigger;
use crate::detect::DevToolsEvidence;
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

/// Capacity of the host-facing event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Something the shield did or noticed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShieldEventKind {
    Activated,
    Disposed,
    Protected { trigger: Trigger },
    Released { held_ms: u64 },
    /// A trigger arrived while fullscreen suppression was in force
    Suppressed { trigger: Trigger },
    DevTools {
        open: bool,
        evidence: Option<DevToolsEvidence>,
    },
    Fullscreen { active: bool },
    ShortcutBlocked { shortcut: String },
    ClipboardBlocked { cut: bool },
    DragBlocked,
    ContextMenuBlocked,
    SelectionBlocked,
    ClipboardScrubbed { ok: bool },
    DisplayMediaRejected,
    WatermarkRendered { text: String },
    WatermarkRemoved,
}

/// A timestamped shield event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShieldEvent {
    /// Activation that produced the event
    pub activation: Uuid,
    /// Page time in milliseconds
    pub at_ms: u64,
    #[serde(flatten)]
    pub kind: ShieldEventKind,
}

/// Sending half of the event stream, shared by the shield's components.
#[derive(Debug, Clone)]
pub struct EventSink {
    activation: Uuid,
    sender: Sender<ShieldEvent>,
}

impl EventSink {
    /// Create a sink and the receiver the host reads from.
    pub fn channel(activation: Uuid) -> (Self, Receiver<ShieldEvent>) {
        let (sender, receiver) = bounded(EVENT_CHANNEL_CAPACITY);
        (Self { activation, sender }, receiver)
    }

    pub fn activation(&self) -> Uuid {
        self.activation
    }

    /// Queue an event. Never blocks: when the host is not draining the
    /// channel, the event is dropped.
    pub fn emit(&self, at: Duration, kind: ShieldEventKind) {
        let event = ShieldEvent {
            activation: self.activation,
            at_ms: at.as_millis() as u64,
            kind,
        };
        let _ = self.sender.try_send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_and_receive() {
        let id = Uuid::new_v4();
        let (sink, receiver) = EventSink::channel(id);
        sink.emit(Duration::from_millis(42), ShieldEventKind::DragBlocked);

        let event = receiver.try_recv().unwrap();
        assert_eq!(event.activation, id);
        assert_eq!(event.at_ms, 42);
        assert_eq!(event.kind, ShieldEventKind::DragBlocked);
    }

    #[test]
    fn test_full_channel_drops_instead_of_blocking() {
        let (sink, receiver) = EventSink::channel(Uuid::new_v4());
        for _ in 0..EVENT_CHANNEL_CAPACITY + 10 {
            sink.emit(Duration::ZERO, ShieldEventKind::ContextMenuBlocked);
        }
        assert_eq!(receiver.len(), EVENT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_event_json_is_flat() {
        let event = ShieldEvent {
            activation: Uuid::nil(),
            at_ms: 7,
            kind: ShieldEventKind::Protected {
                trigger: Trigger::PrintScreen,
            },
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], "protected");
        assert_eq!(value["trigger"], "print_screen");
        assert_eq!(value["at_ms"], 7);
    }
}
