//! In-memory page used by tests, the simulator and non-browser hosts.
//!
//! Time is virtual: nothing fires until the driver asks for due work with
//! [`HeadlessPage::pop_due`]. Listener, timer and frame bookkeeping is kept
//! so tests can assert that a disposed shield left nothing behind.

use crate::platform::types::{
    EventKind, FrameId, ListenerId, ListenerSpec, Overlay, Signal, TimerId, WindowMetrics,
};
use crate::platform::{Page, PageError};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Spacing between animation frames (60 Hz).
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// An `<img>` or `<video>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaElement {
    pub tag: String,
    /// Inline `filter` style, if any
    pub filter: Option<String>,
    pub draggable: bool,
}

impl MediaElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            filter: None,
            draggable: true,
        }
    }
}

#[derive(Debug, Clone)]
struct PendingTimer {
    deadline: Duration,
    period: Option<Duration>,
    seq: u64,
}

#[derive(Debug, Clone)]
struct PendingFrame {
    deadline: Duration,
    seq: u64,
}

/// A page whose state lives entirely in memory.
#[derive(Debug)]
pub struct HeadlessPage {
    now: Duration,
    metrics: WindowMetrics,
    debugger_pause: Duration,
    pixel_ratio: f64,
    focused: bool,
    hidden: bool,
    fullscreen: bool,
    fullscreen_supported: bool,
    display_media_supported: bool,
    listeners: BTreeMap<ListenerId, ListenerSpec>,
    timers: BTreeMap<TimerId, PendingTimer>,
    frames: BTreeMap<FrameId, PendingFrame>,
    next_listener: u32,
    next_timer: i32,
    next_frame: i32,
    seq: u64,
    body_classes: BTreeSet<String>,
    media: Vec<MediaElement>,
    overlays: Vec<Overlay>,
    clipboard: String,
    clipboard_writes: usize,
    clipboard_denied: bool,
    display_media_blocked: bool,
    console_silenced: bool,
}

impl Default for HeadlessPage {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessPage {
    /// A focused, visible, windowed page with one video and one image.
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            metrics: WindowMetrics {
                outer_width: 1280.0,
                outer_height: 880.0,
                inner_width: 1280.0,
                inner_height: 800.0,
            },
            debugger_pause: Duration::ZERO,
            pixel_ratio: 1.0,
            focused: true,
            hidden: false,
            fullscreen: false,
            fullscreen_supported: true,
            display_media_supported: true,
            listeners: BTreeMap::new(),
            timers: BTreeMap::new(),
            frames: BTreeMap::new(),
            next_listener: 1,
            next_timer: 1,
            next_frame: 1,
            seq: 0,
            body_classes: BTreeSet::new(),
            media: vec![MediaElement::new("video"), MediaElement::new("img")],
            overlays: Vec::new(),
            clipboard: String::new(),
            clipboard_writes: 0,
            clipboard_denied: false,
            display_media_blocked: false,
            console_silenced: false,
        }
    }

    /// A page whose browser exposes no fullscreen API.
    pub fn without_fullscreen_api() -> Self {
        Self {
            fullscreen_supported: false,
            ..Self::new()
        }
    }

    /// A page without `navigator.mediaDevices.getDisplayMedia`.
    pub fn without_display_media() -> Self {
        Self {
            display_media_supported: false,
            ..Self::new()
        }
    }

    // --- environment controls -------------------------------------------

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }

    pub fn set_metrics(&mut self, metrics: WindowMetrics) {
        self.metrics = metrics;
    }

    pub fn metrics(&self) -> WindowMetrics {
        self.metrics
    }

    pub fn set_debugger_pause(&mut self, pause: Duration) {
        self.debugger_pause = pause;
    }

    pub fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = ratio;
    }

    /// Make every clipboard write fail with a permission error.
    pub fn deny_clipboard(&mut self, denied: bool) {
        self.clipboard_denied = denied;
    }

    /// Append a media element, as a page script would.
    pub fn insert_media(&mut self, tag: &str) {
        self.media.push(MediaElement::new(tag));
    }

    // --- inspection -----------------------------------------------------

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Whether any listener for this event family is registered.
    pub fn listens_for(&self, kind: EventKind) -> bool {
        self.listeners.values().any(|spec| spec.kind == kind)
    }

    pub fn listeners(&self) -> impl Iterator<Item = &ListenerSpec> {
        self.listeners.values()
    }

    pub fn pending_timer_count(&self) -> usize {
        self.timers.len()
    }

    pub fn pending_frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn has_body_class(&self, class: &str) -> bool {
        self.body_classes.contains(class)
    }

    pub fn body_classes(&self) -> impl Iterator<Item = &str> {
        self.body_classes.iter().map(String::as_str)
    }

    pub fn media(&self) -> &[MediaElement] {
        &self.media
    }

    pub fn overlay(&self, id: &str) -> Option<&Overlay> {
        self.overlays.iter().find(|o| o.id == id)
    }

    pub fn overlay_count(&self, id: &str) -> usize {
        self.overlays.iter().filter(|o| o.id == id).count()
    }

    /// Overlay ids in body order; the last one paints on top.
    pub fn overlay_order(&self) -> Vec<&str> {
        self.overlays.iter().map(|o| o.id.as_str()).collect()
    }

    pub fn clipboard(&self) -> &str {
        &self.clipboard
    }

    /// Number of clipboard writes attempted, including denied ones.
    pub fn clipboard_writes(&self) -> usize {
        self.clipboard_writes
    }

    pub fn display_media_blocked(&self) -> bool {
        self.display_media_blocked
    }

    pub fn display_media_supported(&self) -> bool {
        self.display_media_supported
    }

    pub fn console_silenced(&self) -> bool {
        self.console_silenced
    }

    // --- virtual time ---------------------------------------------------

    /// Move the clock forward without firing anything.
    pub fn set_now(&mut self, now: Duration) {
        if now > self.now {
            self.now = now;
        }
    }

    /// Remove and return the earliest timer or frame due at or before
    /// `until`, moving the clock to its deadline. Frames do not fire while
    /// the document is hidden.
    pub fn pop_due(&mut self, until: Duration) -> Option<Signal> {
        let timer = self
            .timers
            .iter()
            .filter(|(_, t)| t.deadline <= until)
            .min_by_key(|(_, t)| (t.deadline, t.seq))
            .map(|(id, t)| (t.deadline, t.seq, *id));

        let frame = if self.hidden {
            None
        } else {
            self.frames
                .iter()
                .filter(|(_, f)| f.deadline <= until)
                .min_by_key(|(_, f)| (f.deadline, f.seq))
                .map(|(id, f)| (f.deadline, f.seq, *id))
        };

        let take_timer = match (timer, frame) {
            (None, None) => return None,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (Some((td, ts, _)), Some((fd, fs, _))) => (td, ts) <= (fd, fs),
        };

        if take_timer {
            let (deadline, _, id) = timer?;
            self.set_now(deadline);
            let seq = self.next_seq();
            match self.timers.get(&id).and_then(|t| t.period) {
                Some(period) => {
                    if let Some(entry) = self.timers.get_mut(&id) {
                        entry.deadline = deadline + period;
                        entry.seq = seq;
                    }
                }
                None => {
                    self.timers.remove(&id);
                }
            }
            Some(Signal::Timer(id))
        } else {
            let (deadline, _, id) = frame?;
            self.set_now(deadline);
            self.frames.remove(&id);
            Some(Signal::Frame(id))
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }
}

impl Page for HeadlessPage {
    fn now(&self) -> Duration {
        self.now
    }

    fn window_metrics(&self) -> Option<WindowMetrics> {
        Some(self.metrics)
    }

    fn debugger_pause(&mut self) -> Option<Duration> {
        Some(self.debugger_pause)
    }

    fn device_pixel_ratio(&self) -> Option<f64> {
        Some(self.pixel_ratio)
    }

    fn has_focus(&self) -> Option<bool> {
        Some(self.focused && !self.hidden)
    }

    fn document_hidden(&self) -> Option<bool> {
        Some(self.hidden)
    }

    fn fullscreen_active(&self) -> Option<bool> {
        self.fullscreen_supported.then_some(self.fullscreen)
    }

    fn add_listener(&mut self, spec: ListenerSpec) -> Result<ListenerId, PageError> {
        if spec.kind == EventKind::FullscreenChange && !self.fullscreen_supported {
            return Err(PageError::Unsupported("fullscreenchange"));
        }
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.insert(id, spec);
        Ok(id)
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.remove(&id);
    }

    fn set_timeout(&mut self, delay: Duration) -> Result<TimerId, PageError> {
        let id = TimerId(self.next_timer);
        self.next_timer += 1;
        let seq = self.next_seq();
        self.timers.insert(
            id,
            PendingTimer {
                deadline: self.now + delay,
                period: None,
                seq,
            },
        );
        Ok(id)
    }

    fn set_interval(&mut self, period: Duration) -> Result<TimerId, PageError> {
        let id = TimerId(self.next_timer);
        self.next_timer += 1;
        let seq = self.next_seq();
        // Browsers clamp zero-length intervals; so do we.
        let period = period.max(Duration::from_millis(1));
        self.timers.insert(
            id,
            PendingTimer {
                deadline: self.now + period,
                period: Some(period),
                seq,
            },
        );
        Ok(id)
    }

    fn clear_timer(&mut self, id: TimerId) {
        self.timers.remove(&id);
    }

    fn request_frame(&mut self) -> Result<FrameId, PageError> {
        let id = FrameId(self.next_frame);
        self.next_frame += 1;
        let seq = self.next_seq();
        self.frames.insert(
            id,
            PendingFrame {
                deadline: self.now + FRAME_INTERVAL,
                seq,
            },
        );
        Ok(id)
    }

    fn cancel_frame(&mut self, id: FrameId) {
        self.frames.remove(&id);
    }

    fn add_body_class(&mut self, class: &str) -> Result<(), PageError> {
        self.body_classes.insert(class.to_string());
        Ok(())
    }

    fn remove_body_class(&mut self, class: &str) -> Result<(), PageError> {
        self.body_classes.remove(class);
        Ok(())
    }

    fn set_media_filter(&mut self, filter: Option<&str>) -> Result<usize, PageError> {
        for element in &mut self.media {
            element.filter = filter.map(str::to_string);
        }
        Ok(self.media.len())
    }

    fn lock_media(&mut self) -> Result<usize, PageError> {
        for element in &mut self.media {
            element.draggable = false;
        }
        Ok(self.media.len())
    }

    fn upsert_overlay(&mut self, overlay: &Overlay) -> Result<(), PageError> {
        self.overlays.retain(|o| o.id != overlay.id);
        self.overlays.push(overlay.clone());
        Ok(())
    }

    fn remove_overlay(&mut self, id: &str) -> Result<bool, PageError> {
        let before = self.overlays.len();
        self.overlays.retain(|o| o.id != id);
        Ok(self.overlays.len() != before)
    }

    fn write_clipboard(&mut self, text: &str) -> Result<(), PageError> {
        self.clipboard_writes += 1;
        if self.clipboard_denied {
            return Err(PageError::PermissionDenied("clipboard-write".to_string()));
        }
        self.clipboard = text.to_string();
        Ok(())
    }

    fn block_display_media(&mut self) -> Result<(), PageError> {
        if !self.display_media_supported {
            return Err(PageError::Unsupported("navigator.mediaDevices.getDisplayMedia"));
        }
        self.display_media_blocked = true;
        Ok(())
    }

    fn restore_display_media(&mut self) {
        self.display_media_blocked = false;
    }

    fn silence_console(&mut self) -> Result<(), PageError> {
        self.console_silenced = true;
        Ok(())
    }

    fn restore_console(&mut self) {
        self.console_silenced = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timers_fire_in_deadline_order() {
        let mut page = HeadlessPage::new();
        let late = page.set_timeout(Duration::from_millis(300)).unwrap();
        let early = page.set_timeout(Duration::from_millis(100)).unwrap();

        assert_eq!(
            page.pop_due(Duration::from_millis(500)),
            Some(Signal::Timer(early))
        );
        assert_eq!(page.now(), Duration::from_millis(100));
        assert_eq!(
            page.pop_due(Duration::from_millis(500)),
            Some(Signal::Timer(late))
        );
        assert_eq!(page.pop_due(Duration::from_millis(500)), None);
        assert_eq!(page.pending_timer_count(), 0);
    }

    #[test]
    fn test_interval_reschedules() {
        let mut page = HeadlessPage::new();
        let id = page.set_interval(Duration::from_millis(50)).unwrap();

        let mut fired = 0;
        while let Some(signal) = page.pop_due(Duration::from_millis(200)) {
            assert_eq!(signal, Signal::Timer(id));
            fired += 1;
        }
        assert_eq!(fired, 4);
        assert_eq!(page.pending_timer_count(), 1);

        page.clear_timer(id);
        assert_eq!(page.pending_timer_count(), 0);
    }

    #[test]
    fn test_frames_wait_while_hidden() {
        let mut page = HeadlessPage::new();
        let frame = page.request_frame().unwrap();
        page.set_hidden(true);
        assert_eq!(page.pop_due(Duration::from_millis(100)), None);

        page.set_hidden(false);
        assert_eq!(
            page.pop_due(Duration::from_millis(100)),
            Some(Signal::Frame(frame))
        );
    }

    #[test]
    fn test_overlay_upsert_keeps_one_node() {
        let mut page = HeadlessPage::new();
        let mut overlay = Overlay {
            id: "mark".to_string(),
            class: "mark".to_string(),
            lines: vec!["a".to_string()],
            opacity: 0.1,
            style: String::new(),
        };
        page.upsert_overlay(&overlay).unwrap();
        overlay.lines = vec!["b".to_string()];
        page.upsert_overlay(&overlay).unwrap();

        assert_eq!(page.overlay_count("mark"), 1);
        assert_eq!(page.overlay("mark").unwrap().lines, vec!["b".to_string()]);
        assert!(page.remove_overlay("mark").unwrap());
        assert!(!page.remove_overlay("mark").unwrap());
    }

    #[test]
    fn test_denied_clipboard_still_counts_attempt() {
        let mut page = HeadlessPage::new();
        page.deny_clipboard(true);
        assert!(page.write_clipboard("x").is_err());
        assert_eq!(page.clipboard_writes(), 1);
        assert_eq!(page.clipboard(), "");
    }

    #[test]
    fn test_unsupported_fullscreen() {
        let mut page = HeadlessPage::without_fullscreen_api();
        assert_eq!(page.fullscreen_active(), None);
        assert!(page
            .add_listener(ListenerSpec::document(EventKind::FullscreenChange, false))
            .is_err());
    }
}
