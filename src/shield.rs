//! Activation and teardown.
//!
//! [`init_security_protection`] registers every enabled detector and guard on
//! a page and returns the [`Shield`] that owns them. The platform delivers
//! fired listeners, timers and animation frames to [`Shield::handle`].
//! [`Shield::dispose`] (also run on drop) removes everything the activation
//! registered and may be called any number of times.
//!
//! Activating twice on the same page without disposing the first shield
//! registers every listener twice. Hosts mount one shield per page.

use crate::config::ProtectionConfig;
use crate::controller::{Phase, ProtectionController, ProtectionState};
use crate::detect::{self, DevToolsEvidence, Observation};
use crate::guard::{GuardPolicy, InputGuard};
use crate::platform::{
    EventKind, FrameId, KeyEvent, ListenerId, ListenerSpec, Page, PageEvent, Signal, TimerId,
    Verdict,
};
use crate::transparency::{
    create_shared_log, AuditStats, EventSink, SharedAuditLog, ShieldEvent, ShieldEventKind,
};
use crate::watermark::{Identity, WatermarkOverlay};
use crossbeam_channel::Receiver;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Marks the body as protected for the lifetime of an activation.
pub const PROTECTED_CLASS: &str = "security-protected";
/// Set while selection blocking is on.
pub const NO_SELECT_CLASS: &str = "security-no-select";
/// Set while drag blocking is on.
pub const NO_DRAG_CLASS: &str = "security-no-drag";

/// Snapshot of a shield for display.
#[derive(Debug, Clone, Serialize)]
pub struct ShieldStatus {
    pub activation: Uuid,
    pub disposed: bool,
    #[serde(flatten)]
    pub phase: Phase,
    pub state: ProtectionState,
    pub watermark: Option<String>,
    pub audit: AuditStats,
}

/// One activation of the content shield on a page.
pub struct Shield<P: Page> {
    page: P,
    config: ProtectionConfig,
    controller: ProtectionController,
    guard: InputGuard,
    watermark: WatermarkOverlay,
    identity: Option<Identity>,
    sink: EventSink,
    events: Receiver<ShieldEvent>,
    audit: SharedAuditLog,
    listeners: Vec<ListenerId>,
    devtools_poll: Option<TimerId>,
    pixel_ratio_poll: Option<TimerId>,
    focus_frame: Option<FrameId>,
    print_screen_down: bool,
    display_media_blocked: bool,
    console_silenced: bool,
    disposed: bool,
}

/// Activate protection on `page`.
///
/// Never fails: a defense the page cannot support is logged and skipped.
pub fn init_security_protection<P: Page>(page: P, mut config: ProtectionConfig) -> Shield<P> {
    let activation = Uuid::new_v4();
    let (sink, events) = EventSink::channel(activation);
    let audit = create_shared_log();

    let hooks = std::mem::take(&mut config.hooks);
    let mut controller = ProtectionController::new(
        &page,
        config.timings.clone(),
        hooks,
        sink.clone(),
        audit.clone(),
    );
    // Blur/focus listeners and the frame poll are the only focus sources.
    controller.set_focus_reported(
        config.enable_visibility_protection || config.enable_screen_capture_protection,
    );
    let guard = InputGuard::new(GuardPolicy::from(&config), sink.clone(), audit.clone());
    let watermark = WatermarkOverlay::new(&config.watermark);

    let mut shield = Shield {
        page,
        config,
        controller,
        guard,
        watermark,
        identity: None,
        sink,
        events,
        audit,
        listeners: Vec::new(),
        devtools_poll: None,
        pixel_ratio_poll: None,
        focus_frame: None,
        print_screen_down: false,
        display_media_blocked: false,
        console_silenced: false,
        disposed: false,
    };
    shield.activate();
    shield
}

impl<P: Page> Shield<P> {
    fn activate(&mut self) {
        let capture = self.config.enable_screen_capture_protection;
        let visibility = self.config.enable_visibility_protection;

        // Guards run in the capture phase, ahead of page handlers.
        if self.config.disable_keyboard_shortcuts || capture {
            self.listen(ListenerSpec::document(EventKind::KeyDown, true));
        }
        if capture {
            self.listen(ListenerSpec::document(EventKind::KeyUp, true));
        }
        self.listen(ListenerSpec::document(EventKind::ContextMenu, true));
        if self.config.disable_copy {
            self.listen(ListenerSpec::document(EventKind::Copy, true));
            self.listen(ListenerSpec::document(EventKind::Cut, true));
        }
        if self.config.disable_drag {
            self.listen(ListenerSpec::document(EventKind::DragStart, true));
            self.listen(ListenerSpec::document(EventKind::Drop, true));
        }
        if self.config.disable_selection {
            self.listen(ListenerSpec::document(EventKind::SelectStart, true));
        }
        self.listen(ListenerSpec::document(EventKind::MediaInserted, false));

        if visibility {
            self.listen(ListenerSpec::document(EventKind::VisibilityChange, false));
        }
        if visibility || capture {
            self.listen(ListenerSpec::window(EventKind::Blur));
            self.listen(ListenerSpec::window(EventKind::Focus));
            self.listen(ListenerSpec::document(EventKind::FullscreenChange, false));
        }
        if capture || self.config.disable_dev_tools {
            self.listen(ListenerSpec::window(EventKind::Resize));
        }
        if capture {
            self.listen(ListenerSpec::document(EventKind::MouseLeave, false));
            self.listen(ListenerSpec::document(EventKind::MouseEnter, false));
            self.block_display_media();
        }

        if self.config.disable_dev_tools {
            self.devtools_poll = self.interval(self.config.timings.devtools_poll, "devtools");
        }
        if capture {
            self.pixel_ratio_poll =
                self.interval(self.config.timings.pixel_ratio_poll, "pixel ratio");
            self.request_focus_frame();
        }

        if self.config.silences_console() {
            match self.page.silence_console() {
                Ok(()) => self.console_silenced = true,
                Err(e) => debug!("could not silence console: {e}"),
            }
        }

        self.add_class(PROTECTED_CLASS);
        if self.config.disable_selection {
            self.add_class(NO_SELECT_CLASS);
        }
        if self.config.disable_drag {
            self.add_class(NO_DRAG_CLASS);
            if let Err(e) = self.page.lock_media() {
                debug!("could not lock media dragging: {e}");
            }
        }

        if self.config.enable_watermark {
            self.render_watermark();
        }

        self.sink.emit(self.page.now(), ShieldEventKind::Activated);
        info!(
            activation = %self.sink.activation(),
            listeners = self.listeners.len(),
            "content protection activated"
        );
    }

    /// Deliver fired work from the platform.
    ///
    /// The returned verdict must be applied to the triggering event before
    /// the handler returns. After disposal every signal passes.
    pub fn handle(&mut self, signal: Signal) -> Verdict {
        if self.disposed {
            return Verdict::PASS;
        }
        match signal {
            Signal::Event(event) => self.on_event(event),
            Signal::Timer(id) => {
                self.on_timer(id);
                Verdict::PASS
            }
            Signal::Frame(id) => {
                self.on_frame(id);
                Verdict::PASS
            }
        }
    }

    fn on_event(&mut self, event: PageEvent) -> Verdict {
        let page = &mut self.page;
        match &event {
            PageEvent::KeyDown(key) => {
                self.on_key_down(key);
                self.guard.inspect(self.page.now(), &event)
            }
            PageEvent::KeyUp(key) => {
                self.on_key_up(key);
                Verdict::PASS
            }
            PageEvent::VisibilityChange => {
                let hidden = detect::is_hidden(&*page);
                self.controller.observe(page, Observation::Hidden(hidden));
                Verdict::PASS
            }
            PageEvent::WindowBlur => {
                self.controller.observe(page, Observation::Focus(false));
                Verdict::PASS
            }
            PageEvent::WindowFocus => {
                self.controller.observe(page, Observation::Focus(true));
                Verdict::PASS
            }
            PageEvent::FullscreenChange => {
                let active = detect::is_fullscreen_active(&*page);
                self.controller.observe(page, Observation::Fullscreen(active));
                Verdict::PASS
            }
            PageEvent::Resize => {
                self.on_resize();
                Verdict::PASS
            }
            PageEvent::MouseLeave => {
                self.controller.observe(page, Observation::PointerInside(false));
                Verdict::PASS
            }
            PageEvent::MouseEnter => {
                self.controller.observe(page, Observation::PointerInside(true));
                Verdict::PASS
            }
            PageEvent::MediaInserted { count } => {
                debug!(count, "media inserted");
                if self.config.disable_drag {
                    if let Err(e) = page.lock_media() {
                        debug!("could not lock inserted media: {e}");
                    }
                }
                self.controller.refresh_media(page);
                Verdict::PASS
            }
            PageEvent::DisplayMediaRequest => {
                if !self.display_media_blocked {
                    return Verdict::PASS;
                }
                warn!("display-media request rejected");
                self.audit.record_display_media_rejection();
                self.sink
                    .emit(page.now(), ShieldEventKind::DisplayMediaRejected);
                Verdict::BLOCK
            }
            PageEvent::ContextMenu { .. }
            | PageEvent::Copy
            | PageEvent::Cut
            | PageEvent::DragStart { .. }
            | PageEvent::Drop
            | PageEvent::SelectStart { .. } => self.guard.inspect(page.now(), &event),
        }
    }

    fn on_key_down(&mut self, key: &KeyEvent) {
        if !self.config.enable_screen_capture_protection {
            return;
        }
        if key.is_print_screen() {
            self.controller
                .observe(&mut self.page, Observation::PrintScreen);
            if !self.print_screen_down {
                self.scrub_clipboard();
            }
            self.print_screen_down = true;
        } else if key.is_capture_modifier() || (key.meta && key.shift) {
            self.controller
                .observe(&mut self.page, Observation::CaptureKey);
        }
    }

    fn on_key_up(&mut self, key: &KeyEvent) {
        if !self.config.enable_screen_capture_protection || !key.is_print_screen() {
            return;
        }
        self.controller
            .observe(&mut self.page, Observation::PrintScreen);
        // Some platforms deliver only the keyup.
        if !self.print_screen_down {
            self.scrub_clipboard();
        }
        self.print_screen_down = false;
    }

    fn on_resize(&mut self) {
        if self.controller.polling_suspended() {
            return;
        }
        if self.config.disable_dev_tools {
            self.sample_window_size();
        }
        if self.config.enable_screen_capture_protection {
            self.sample_pixel_ratio();
        }
    }

    fn on_timer(&mut self, id: TimerId) {
        if self.controller.on_timer(&mut self.page, id) {
            return;
        }
        if self.devtools_poll == Some(id) {
            self.sample_dev_tools();
        } else if self.pixel_ratio_poll == Some(id) {
            self.sample_pixel_ratio();
        }
    }

    fn on_frame(&mut self, id: FrameId) {
        if self.focus_frame != Some(id) {
            return;
        }
        self.focus_frame = None;
        if !self.controller.polling_suspended() {
            let focused = detect::has_focus(&self.page);
            self.controller
                .observe(&mut self.page, Observation::Focus(focused));
        }
        self.request_focus_frame();
    }

    fn sample_dev_tools(&mut self) {
        let evidence = detect::sample_dev_tools(&mut self.page, self.controller.timings());
        self.controller
            .observe(&mut self.page, Observation::DevTools(evidence));
    }

    /// Resize only runs the size check; the debugger check stays on the poll.
    fn sample_window_size(&mut self) {
        let evidence = detect::sample_window_size(&self.page, self.controller.timings());
        let docked = self.controller.dev_tools_evidence() == Some(DevToolsEvidence::WindowSize);
        if evidence.is_some() || docked {
            self.controller
                .observe(&mut self.page, Observation::DevTools(evidence));
        }
    }

    fn sample_pixel_ratio(&mut self) {
        if let Some(ratio) = detect::pixel_ratio(&self.page) {
            self.controller
                .observe(&mut self.page, Observation::PixelRatio(ratio));
        }
    }

    fn scrub_clipboard(&mut self) {
        let ok = match self.page.write_clipboard(&self.config.clipboard_placeholder) {
            Ok(()) => true,
            Err(e) => {
                debug!("clipboard scrub failed: {e}");
                false
            }
        };
        self.audit.record_clipboard_scrub();
        self.sink
            .emit(self.page.now(), ShieldEventKind::ClipboardScrubbed { ok });
    }

    fn block_display_media(&mut self) {
        match self.page.block_display_media() {
            Ok(()) => {
                self.display_media_blocked = true;
                self.listen(ListenerSpec::window(EventKind::DisplayMediaRequest));
            }
            Err(e) => debug!("display-media interception unavailable: {e}"),
        }
    }

    fn listen(&mut self, spec: ListenerSpec) {
        match self.page.add_listener(spec) {
            Ok(id) => self.listeners.push(id),
            Err(e) => debug!(event = %spec.kind, "listener not registered: {e}"),
        }
    }

    fn interval(&mut self, period: std::time::Duration, name: &str) -> Option<TimerId> {
        match self.page.set_interval(period) {
            Ok(id) => Some(id),
            Err(e) => {
                debug!(poll = name, "could not start poll: {e}");
                None
            }
        }
    }

    fn request_focus_frame(&mut self) {
        match self.page.request_frame() {
            Ok(id) => self.focus_frame = Some(id),
            Err(e) => debug!("focus poll stopped: {e}"),
        }
    }

    fn add_class(&mut self, class: &str) {
        if let Err(e) = self.page.add_body_class(class) {
            debug!(class, "could not add body class: {e}");
        }
    }

    fn render_watermark(&mut self) {
        let text = self
            .watermark
            .render(self.identity.as_ref(), &self.config.watermark_text);
        match self.watermark.show(&mut self.page, text.clone()) {
            Ok(()) => self
                .sink
                .emit(self.page.now(), ShieldEventKind::WatermarkRendered { text }),
            Err(e) => debug!("could not render watermark: {e}"),
        }
    }

    /// Change the identity stamped into the watermark, re-rendering it
    /// without re-activating.
    pub fn set_identity(&mut self, identity: Option<Identity>) {
        if self.identity == identity {
            return;
        }
        self.identity = identity;
        if self.config.enable_watermark && !self.disposed {
            self.render_watermark();
        }
    }

    /// Identity currently stamped into the watermark.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Remove every listener, timer, frame, class and overlay this
    /// activation created and restore patched page APIs.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        for id in self.listeners.drain(..) {
            self.page.remove_listener(id);
        }
        for id in [self.devtools_poll.take(), self.pixel_ratio_poll.take()]
            .into_iter()
            .flatten()
        {
            self.page.clear_timer(id);
        }
        if let Some(id) = self.focus_frame.take() {
            self.page.cancel_frame(id);
        }

        self.controller.teardown(&mut self.page);

        if self.watermark.mounted().is_some() {
            match self.watermark.hide(&mut self.page) {
                Ok(_) => self
                    .sink
                    .emit(self.page.now(), ShieldEventKind::WatermarkRemoved),
                Err(e) => debug!("could not remove watermark: {e}"),
            }
        }
        if std::mem::take(&mut self.display_media_blocked) {
            self.page.restore_display_media();
        }
        if std::mem::take(&mut self.console_silenced) {
            self.page.restore_console();
        }
        for class in [PROTECTED_CLASS, NO_SELECT_CLASS, NO_DRAG_CLASS] {
            if let Err(e) = self.page.remove_body_class(class) {
                debug!(class, "could not remove body class: {e}");
            }
        }

        self.sink.emit(self.page.now(), ShieldEventKind::Disposed);
        info!(activation = %self.sink.activation(), "content protection disposed");
    }

    /// Whether [`Shield::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Whether content is currently degraded.
    pub fn is_protected(&self) -> bool {
        self.controller.is_protected()
    }

    /// The state machine behind this shield.
    pub fn controller(&self) -> &ProtectionController {
        &self.controller
    }

    /// Id stamped on every event of this activation.
    pub fn activation(&self) -> Uuid {
        self.sink.activation()
    }

    /// Receiver for the event stream. Every clone shares one queue.
    pub fn events(&self) -> Receiver<ShieldEvent> {
        self.events.clone()
    }

    /// Counters for everything this activation blocked or detected.
    pub fn audit(&self) -> &SharedAuditLog {
        &self.audit
    }

    /// The page this shield is mounted on.
    pub fn page(&self) -> &P {
        &self.page
    }

    /// Mutable access for drivers that change page state between signals.
    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    /// Serializable snapshot for display.
    pub fn status(&self) -> ShieldStatus {
        ShieldStatus {
            activation: self.activation(),
            disposed: self.disposed,
            phase: self.controller.phase(),
            state: self.controller.state().clone(),
            watermark: self.watermark.mounted().map(str::to_string),
            audit: self.audit.stats(),
        }
    }
}

/// Lifecycle calls that arrived while the shield was busy handling a
/// signal, for example a host hook that unmounts the page.
///
/// The platform applies them right after [`Shield::handle`] returns.
#[derive(Debug, Default)]
pub struct DeferredCalls {
    dispose: Cell<bool>,
    identity: RefCell<Option<Option<Identity>>>,
}

impl DeferredCalls {
    pub fn request_dispose(&self) {
        self.dispose.set(true);
    }

    /// Later requests replace earlier ones.
    pub fn request_identity(&self, identity: Option<Identity>) {
        *self.identity.borrow_mut() = Some(identity);
    }

    pub fn is_empty(&self) -> bool {
        !self.dispose.get() && self.identity.borrow().is_none()
    }

    /// Apply and clear everything requested so far.
    pub fn apply<P: Page>(&self, shield: &mut Shield<P>) {
        if let Some(identity) = self.identity.borrow_mut().take() {
            shield.set_identity(identity);
        }
        if self.dispose.take() {
            shield.dispose();
        }
    }
}

impl<P: Page> Drop for Shield<P> {
    fn drop(&mut self) {
        self.dispose();
    }
}
