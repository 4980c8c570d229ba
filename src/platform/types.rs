//! Page-level event and handle types shared by every platform.
//!
//! These types describe only what the shield needs to decide: key identity
//! and modifiers, the coarse kind of element an event targeted, and opaque
//! handles for registered listeners, timers and animation frames.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of a registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ListenerId(pub u32);

/// Handle of a pending timeout or interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerId(pub i32);

/// Handle of a pending animation-frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameId(pub i32);

/// Where a listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListenerTarget {
    Document,
    Window,
}

/// The DOM event families the shield listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    KeyDown,
    KeyUp,
    ContextMenu,
    Copy,
    Cut,
    DragStart,
    Drop,
    SelectStart,
    VisibilityChange,
    Blur,
    Focus,
    FullscreenChange,
    Resize,
    MouseLeave,
    MouseEnter,
    /// Media elements inserted into the document (mutation observer).
    MediaInserted,
    /// A page script asked for a display-media stream.
    DisplayMediaRequest,
}

impl EventKind {
    /// DOM event type name.
    pub fn dom_name(self) -> &'static str {
        match self {
            EventKind::KeyDown => "keydown",
            EventKind::KeyUp => "keyup",
            EventKind::ContextMenu => "contextmenu",
            EventKind::Copy => "copy",
            EventKind::Cut => "cut",
            EventKind::DragStart => "dragstart",
            EventKind::Drop => "drop",
            EventKind::SelectStart => "selectstart",
            EventKind::VisibilityChange => "visibilitychange",
            EventKind::Blur => "blur",
            EventKind::Focus => "focus",
            EventKind::FullscreenChange => "fullscreenchange",
            EventKind::Resize => "resize",
            EventKind::MouseLeave => "mouseleave",
            EventKind::MouseEnter => "mouseenter",
            EventKind::MediaInserted => "media-inserted",
            EventKind::DisplayMediaRequest => "display-media-request",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dom_name())
    }
}

/// Registration request for a single listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerSpec {
    pub target: ListenerTarget,
    pub kind: EventKind,
    /// Capture-phase listeners run before page handlers.
    pub capture: bool,
}

impl ListenerSpec {
    pub fn document(kind: EventKind, capture: bool) -> Self {
        Self {
            target: ListenerTarget::Document,
            kind,
            capture,
        }
    }

    pub fn window(kind: EventKind) -> Self {
        Self {
            target: ListenerTarget::Window,
            kind,
            capture: false,
        }
    }
}

/// A keyboard event as seen by a `keydown`/`keyup` listener.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyEvent {
    /// `KeyboardEvent.key`
    pub key: String,
    /// Legacy `KeyboardEvent.keyCode`, zero when unknown
    #[serde(default)]
    pub key_code: u32,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub meta: bool,
}

impl KeyEvent {
    /// A bare key with no modifiers.
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_code(mut self, key_code: u32) -> Self {
        self.key_code = key_code;
        self
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    /// True for the OS capture modifier itself (Windows/Command key).
    pub fn is_capture_modifier(&self) -> bool {
        matches!(self.key.as_str(), "Meta" | "OS" | "Super") || matches!(self.key_code, 91 | 92 | 93)
    }

    pub fn is_print_screen(&self) -> bool {
        self.key == "PrintScreen" || self.key_code == 44
    }
}

/// Coarse classification of an event target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// `<img>` or `<video>`
    Media,
    /// `<input>`, `<textarea>` or a contenteditable host
    FormInput,
    #[default]
    Other,
}

/// An event delivered from the page to the shield.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageEvent {
    KeyDown(KeyEvent),
    KeyUp(KeyEvent),
    ContextMenu { target: TargetKind },
    Copy,
    Cut,
    DragStart { target: TargetKind },
    Drop,
    SelectStart { target: TargetKind },
    VisibilityChange,
    WindowBlur,
    WindowFocus,
    FullscreenChange,
    Resize,
    MouseLeave,
    MouseEnter,
    MediaInserted { count: usize },
    DisplayMediaRequest,
}

impl PageEvent {
    /// The listener family this event is delivered through.
    pub fn kind(&self) -> EventKind {
        match self {
            PageEvent::KeyDown(_) => EventKind::KeyDown,
            PageEvent::KeyUp(_) => EventKind::KeyUp,
            PageEvent::ContextMenu { .. } => EventKind::ContextMenu,
            PageEvent::Copy => EventKind::Copy,
            PageEvent::Cut => EventKind::Cut,
            PageEvent::DragStart { .. } => EventKind::DragStart,
            PageEvent::Drop => EventKind::Drop,
            PageEvent::SelectStart { .. } => EventKind::SelectStart,
            PageEvent::VisibilityChange => EventKind::VisibilityChange,
            PageEvent::WindowBlur => EventKind::Blur,
            PageEvent::WindowFocus => EventKind::Focus,
            PageEvent::FullscreenChange => EventKind::FullscreenChange,
            PageEvent::Resize => EventKind::Resize,
            PageEvent::MouseLeave => EventKind::MouseLeave,
            PageEvent::MouseEnter => EventKind::MouseEnter,
            PageEvent::MediaInserted { .. } => EventKind::MediaInserted,
            PageEvent::DisplayMediaRequest => EventKind::DisplayMediaRequest,
        }
    }
}

/// Work delivered to the shield by the platform.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Event(PageEvent),
    Timer(TimerId),
    Frame(FrameId),
}

/// What the platform must do with the event that produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Verdict {
    pub prevent_default: bool,
    pub stop_propagation: bool,
}

impl Verdict {
    /// Let the event through untouched.
    pub const PASS: Verdict = Verdict {
        prevent_default: false,
        stop_propagation: false,
    };

    /// Suppress the default action and stop other handlers from seeing it.
    pub const BLOCK: Verdict = Verdict {
        prevent_default: true,
        stop_propagation: true,
    };

    /// Suppress only the default action.
    pub const PREVENT: Verdict = Verdict {
        prevent_default: true,
        stop_propagation: false,
    };

    pub fn is_blocked(&self) -> bool {
        self.prevent_default
    }
}

/// Outer and inner window dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowMetrics {
    pub outer_width: f64,
    pub outer_height: f64,
    pub inner_width: f64,
    pub inner_height: f64,
}

impl WindowMetrics {
    pub fn width_delta(&self) -> f64 {
        self.outer_width - self.inner_width
    }

    pub fn height_delta(&self) -> f64 {
        self.outer_height - self.inner_height
    }
}

/// Description of a fixed-position overlay node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    /// Well-known element id; at most one node per id exists.
    pub id: String,
    pub class: String,
    /// Text of each child line, inserted as text, never as markup.
    pub lines: Vec<String>,
    pub opacity: f64,
    /// Inline CSS applied to the container.
    pub style: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_builders() {
        let event = KeyEvent::key("I").ctrl().shift();
        assert!(event.ctrl && event.shift);
        assert!(!event.alt && !event.meta);
        assert_eq!(event.key_code, 0);
    }

    #[test]
    fn test_capture_modifier_detection() {
        assert!(KeyEvent::key("Meta").is_capture_modifier());
        assert!(KeyEvent::key("Unidentified").with_code(91).is_capture_modifier());
        assert!(!KeyEvent::key("Shift").is_capture_modifier());
    }

    #[test]
    fn test_event_kind_mapping() {
        assert_eq!(PageEvent::WindowBlur.kind(), EventKind::Blur);
        assert_eq!(
            PageEvent::KeyDown(KeyEvent::key("a")).kind(),
            EventKind::KeyDown
        );
        assert_eq!(EventKind::VisibilityChange.to_string(), "visibilitychange");
    }

    #[test]
    fn test_page_event_json_shape() {
        let json = serde_json::to_string(&PageEvent::ContextMenu {
            target: TargetKind::Media,
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"context_menu","target":"media"}"#);
    }
}
