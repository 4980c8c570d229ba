//! Page abstraction for the content shield.
//!
//! The shield never touches the browser directly. Everything it observes or
//! changes goes through [`Page`], which has a headless in-memory
//! implementation for tests and simulation and a web-sys implementation on
//! `wasm32`.

pub mod headless;
pub mod types;

#[cfg(target_arch = "wasm32")]
pub mod web;

use std::time::Duration;

pub use headless::{HeadlessPage, MediaElement};
pub use types::{
    EventKind, FrameId, KeyEvent, ListenerId, ListenerSpec, ListenerTarget, Overlay, PageEvent,
    Signal, TargetKind, TimerId, Verdict, WindowMetrics,
};

#[cfg(target_arch = "wasm32")]
pub use web::{WebPage, WebShield};

/// Errors raised by page operations.
///
/// The shield treats every one of these as "cannot protect this way" and
/// carries on with the remaining defenses.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("{0} is not available on this page")]
    Unsupported(&'static str),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("DOM operation failed: {0}")]
    Dom(String),
}

/// Everything the shield needs from a page.
///
/// Probes return `None` when the underlying API does not exist; mutations
/// return an error instead of panicking. Implementations must never call
/// back into the shield synchronously from inside one of these methods.
pub trait Page {
    /// Monotonic page time (`performance.now()`).
    fn now(&self) -> Duration;

    /// Outer/inner window dimensions.
    fn window_metrics(&self) -> Option<WindowMetrics>;

    /// Time spent across a breakpoint-triggering statement. Long pauses mean
    /// a debugger is attached.
    fn debugger_pause(&mut self) -> Option<Duration>;

    fn device_pixel_ratio(&self) -> Option<f64>;

    /// `document.hasFocus()`
    fn has_focus(&self) -> Option<bool>;

    /// `document.hidden`
    fn document_hidden(&self) -> Option<bool>;

    /// Whether any vendor variant of the fullscreen element is set.
    fn fullscreen_active(&self) -> Option<bool>;

    fn add_listener(&mut self, spec: ListenerSpec) -> Result<ListenerId, PageError>;

    fn remove_listener(&mut self, id: ListenerId);

    fn set_timeout(&mut self, delay: Duration) -> Result<TimerId, PageError>;

    fn set_interval(&mut self, period: Duration) -> Result<TimerId, PageError>;

    /// Clears a timeout or an interval.
    fn clear_timer(&mut self, id: TimerId);

    fn request_frame(&mut self) -> Result<FrameId, PageError>;

    fn cancel_frame(&mut self, id: FrameId);

    fn add_body_class(&mut self, class: &str) -> Result<(), PageError>;

    fn remove_body_class(&mut self, class: &str) -> Result<(), PageError>;

    /// Set (or with `None`, clear) the inline `filter` of every `<img>` and
    /// `<video>`. Returns the number of elements touched.
    fn set_media_filter(&mut self, filter: Option<&str>) -> Result<usize, PageError>;

    /// Mark every `<img>` and `<video>` as non-draggable.
    fn lock_media(&mut self) -> Result<usize, PageError>;

    /// Remove any node with `overlay.id`, then append the overlay as the last
    /// child of the body.
    fn upsert_overlay(&mut self, overlay: &Overlay) -> Result<(), PageError>;

    /// Remove the node with this id. Returns whether one existed.
    fn remove_overlay(&mut self, id: &str) -> Result<bool, PageError>;

    fn write_clipboard(&mut self, text: &str) -> Result<(), PageError>;

    /// Replace `getDisplayMedia` with a rejecting wrapper. The original must
    /// be kept so [`Page::restore_display_media`] can put it back.
    fn block_display_media(&mut self) -> Result<(), PageError>;

    fn restore_display_media(&mut self);

    fn silence_console(&mut self) -> Result<(), PageError>;

    fn restore_console(&mut self);
}
