//! Deterministic simulation of a shielded page.
//!
//! A [`Simulation`] owns a [`Shield`] over a [`HeadlessPage`] and drives it
//! on virtual time: environment changes are applied to the page and the
//! matching DOM event is delivered only if the shield listens for it, the
//! way a browser would.

pub mod scenario;

use crate::config::ProtectionConfig;
use crate::platform::{
    HeadlessPage, KeyEvent, Page, PageEvent, Signal, TargetKind, Verdict, WindowMetrics,
};
use crate::shield::{init_security_protection, Shield};
use crate::transparency::ShieldEvent;
use crate::watermark::Identity;
use crossbeam_channel::Receiver;
use std::time::Duration;

pub use scenario::{Action, Expectation, Scenario, ScenarioError, ScenarioReport, Step};

/// Width a docked devtools pane adds to the outer window.
const DEVTOOLS_PANE_WIDTH: f64 = 320.0;

pub struct Simulation {
    shield: Shield<HeadlessPage>,
    events: Receiver<ShieldEvent>,
    undocked: Option<WindowMetrics>,
}

impl Simulation {
    pub fn new(config: ProtectionConfig) -> Self {
        Self::with_page(HeadlessPage::new(), config)
    }

    pub fn with_page(page: HeadlessPage, config: ProtectionConfig) -> Self {
        let shield = init_security_protection(page, config);
        let events = shield.events();
        Self {
            shield,
            events,
            undocked: None,
        }
    }

    pub fn shield(&self) -> &Shield<HeadlessPage> {
        &self.shield
    }

    pub fn shield_mut(&mut self) -> &mut Shield<HeadlessPage> {
        &mut self.shield
    }

    pub fn page(&self) -> &HeadlessPage {
        self.shield.page()
    }

    pub fn now(&self) -> Duration {
        self.shield.page().now()
    }

    pub fn is_protected(&self) -> bool {
        self.shield.is_protected()
    }

    /// Events emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<ShieldEvent> {
        self.events.try_iter().collect()
    }

    /// Deliver `event` if a listener for it is registered.
    pub fn dispatch(&mut self, event: PageEvent) -> Verdict {
        if !self.shield.page().listens_for(event.kind()) {
            return Verdict::PASS;
        }
        self.shield.handle(Signal::Event(event))
    }

    /// Run every timer and frame due within `by`, in deadline order.
    pub fn advance(&mut self, by: Duration) {
        let target = self.now() + by;
        self.advance_to(target);
    }

    /// Run everything due up to the absolute page time `at`.
    pub fn advance_to(&mut self, at: Duration) {
        while let Some(signal) = self.shield.page_mut().pop_due(at) {
            self.shield.handle(signal);
        }
        self.shield.page_mut().set_now(at);
    }

    pub fn key_down(&mut self, key: KeyEvent) -> Verdict {
        self.dispatch(PageEvent::KeyDown(key))
    }

    pub fn key_up(&mut self, key: KeyEvent) -> Verdict {
        self.dispatch(PageEvent::KeyUp(key))
    }

    /// The window loses OS focus (alt-tab, a native dialog).
    pub fn blur(&mut self) {
        self.shield.page_mut().set_focused(false);
        self.dispatch(PageEvent::WindowBlur);
    }

    pub fn focus(&mut self) {
        self.shield.page_mut().set_focused(true);
        self.dispatch(PageEvent::WindowFocus);
    }

    /// The tab is switched away or minimized.
    pub fn hide(&mut self) {
        self.shield.page_mut().set_hidden(true);
        self.dispatch(PageEvent::VisibilityChange);
    }

    pub fn show(&mut self) {
        self.shield.page_mut().set_hidden(false);
        self.dispatch(PageEvent::VisibilityChange);
    }

    pub fn enter_fullscreen(&mut self) {
        self.shield.page_mut().set_fullscreen(true);
        self.dispatch(PageEvent::FullscreenChange);
        self.dispatch(PageEvent::Resize);
    }

    pub fn exit_fullscreen(&mut self) {
        self.shield.page_mut().set_fullscreen(false);
        self.dispatch(PageEvent::FullscreenChange);
        self.dispatch(PageEvent::Resize);
    }

    /// Dock a devtools pane beside the viewport.
    pub fn open_devtools(&mut self) {
        if self.undocked.is_some() {
            return;
        }
        let metrics = self.shield.page().metrics();
        self.undocked = Some(metrics);
        self.shield.page_mut().set_metrics(WindowMetrics {
            outer_width: metrics.outer_width + DEVTOOLS_PANE_WIDTH,
            ..metrics
        });
        self.dispatch(PageEvent::Resize);
    }

    pub fn close_devtools(&mut self) {
        if let Some(metrics) = self.undocked.take() {
            self.shield.page_mut().set_metrics(metrics);
            self.dispatch(PageEvent::Resize);
        }
    }

    /// Change `devicePixelRatio` without a resize event, as capture tools do.
    pub fn set_pixel_ratio(&mut self, ratio: f64) {
        self.shield.page_mut().set_pixel_ratio(ratio);
    }

    pub fn pointer_leave(&mut self) {
        self.dispatch(PageEvent::MouseLeave);
    }

    pub fn pointer_enter(&mut self) {
        self.dispatch(PageEvent::MouseEnter);
    }

    /// A page script calls `getDisplayMedia`. Returns `true` if rejected.
    pub fn request_display_media(&mut self) -> bool {
        self.dispatch(PageEvent::DisplayMediaRequest).is_blocked()
    }

    pub fn copy(&mut self) -> Verdict {
        self.dispatch(PageEvent::Copy)
    }

    pub fn context_menu(&mut self, target: TargetKind) -> Verdict {
        self.dispatch(PageEvent::ContextMenu { target })
    }

    pub fn insert_media(&mut self, tag: &str) {
        self.shield.page_mut().insert_media(tag);
        self.dispatch(PageEvent::MediaInserted { count: 1 });
    }

    pub fn login(&mut self, identity: Identity) {
        self.shield.set_identity(Some(identity));
    }

    pub fn logout(&mut self) {
        self.shield.set_identity(None);
    }

    pub fn dispose(&mut self) {
        self.shield.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_undelivered_events_pass() {
        let config = ProtectionConfig {
            disable_copy: false,
            ..ProtectionConfig::default()
        };
        let mut sim = Simulation::new(config);
        assert_eq!(sim.copy(), Verdict::PASS);
        assert_eq!(sim.shield().audit().stats().clipboard_blocked, 0);
    }

    #[test]
    fn test_advance_moves_clock_exactly() {
        let mut sim = Simulation::new(ProtectionConfig::default());
        sim.advance(ms(1234));
        assert_eq!(sim.now(), ms(1234));
        sim.advance_to(ms(1000));
        assert_eq!(sim.now(), ms(1234));
    }

    #[test]
    fn test_devtools_open_and_close() {
        let mut sim = Simulation::new(ProtectionConfig::default());
        sim.open_devtools();
        assert!(sim.is_protected());
        assert!(sim.shield().controller().state().dev_tools_open);

        sim.advance(ms(3000));
        assert!(sim.is_protected());

        sim.close_devtools();
        assert!(!sim.is_protected());
    }

    #[test]
    fn test_devtools_found_by_poll_without_resize() {
        let mut sim = Simulation::new(ProtectionConfig::default());
        sim.shield_mut().page_mut().set_debugger_pause(ms(400));
        sim.advance(ms(999));
        assert!(!sim.is_protected());
        sim.advance(ms(1));
        assert!(sim.is_protected());
    }

    #[test]
    fn test_pixel_ratio_change_is_caught_by_poll() {
        let mut sim = Simulation::new(ProtectionConfig::default());
        sim.advance(ms(100));
        sim.set_pixel_ratio(1.25);
        sim.advance(ms(50));
        assert!(sim.is_protected());

        sim.advance(ms(900));
        assert!(!sim.is_protected());
    }

    #[test]
    fn test_pointer_leave_and_return() {
        let mut sim = Simulation::new(ProtectionConfig::default());
        sim.pointer_leave();
        assert!(sim.is_protected());
        sim.advance(ms(1000));
        assert!(sim.is_protected());

        sim.pointer_enter();
        sim.advance(ms(299));
        assert!(sim.is_protected());
        sim.advance(ms(1));
        assert!(!sim.is_protected());
    }

    #[test]
    fn test_focus_poll_catches_silent_focus_loss() {
        let mut sim = Simulation::new(ProtectionConfig::default());
        sim.shield_mut().page_mut().set_focused(false);
        assert!(!sim.is_protected());
        sim.advance(ms(16));
        assert!(sim.is_protected());
    }

    #[test]
    fn test_inserted_media_is_locked_and_filtered() {
        let mut sim = Simulation::new(ProtectionConfig::default());
        sim.blur();
        sim.insert_media("img");

        let media = sim.page().media();
        assert_eq!(media.len(), 3);
        assert!(media.iter().all(|m| !m.draggable && m.filter.is_some()));
    }
}
