//! Protection controller.
//!
//! Turns detector observations into a single protected/unprotected decision
//! and drives the visual response.
//!
//! Entering protection is immediate. Leaving it goes through one
//! cancel-and-replace release timer that fires at `max(now + delay,
//! hold_until)`, where `hold_until` is the latest minimum-protection deadline
//! requested by any momentary trigger (PrintScreen, capture key, pixel-ratio
//! change). The release only happens when no sustained condition is active,
//! the hold has elapsed and the page has focus.

pub mod state;

use crate::config::{Hooks, Timings};
use crate::detect::{self, Observation};
use crate::platform::{Overlay, Page, TimerId};
use crate::transparency::{EventSink, SharedAuditLog, ShieldEventKind};
use std::time::Duration;
use tracing::{debug, info, warn};

pub use state::{Phase, ProtectionState, ThreatSet, Trigger};

/// Body class that host stylesheets key the blur backdrop on.
pub const BLUR_CLASS: &str = "security-blur";

/// Inline filter applied to every `<img>` and `<video>` while protected.
pub const MEDIA_FILTER: &str = "blur(24px) brightness(0.35)";

/// Id of the fixed warning banner.
pub const BANNER_ID: &str = "security-warning";

const BANNER_TEXT: &str = "Content hidden: screen capture or inspection suspected";

/// Shortest interval between focus re-checks when nothing reports focus.
const FOCUS_RECHECK_FLOOR: Duration = Duration::from_millis(50);

/// The state machine behind the shield.
pub struct ProtectionController {
    timings: Timings,
    hooks: Hooks,
    sink: EventSink,
    audit: SharedAuditLog,
    phase: Phase,
    state: ProtectionState,
    active: ThreatSet,
    hold_until: Duration,
    release_timer: Option<TimerId>,
    grace_timer: Option<TimerId>,
    focus_reported: bool,
    dev_tools_evidence: Option<detect::DevToolsEvidence>,
}

impl ProtectionController {
    /// Create a controller seeded from the page's current focus, pixel ratio
    /// and fullscreen state.
    pub fn new<P: Page>(
        page: &P,
        timings: Timings,
        hooks: Hooks,
        sink: EventSink,
        audit: SharedAuditLog,
    ) -> Self {
        let state = ProtectionState::new(
            detect::has_focus(page),
            detect::pixel_ratio(page).unwrap_or(1.0),
            detect::is_fullscreen_active(page),
        );
        Self {
            timings,
            hooks,
            sink,
            audit,
            phase: Phase::Unprotected,
            state,
            active: ThreatSet::default(),
            hold_until: Duration::ZERO,
            release_timer: None,
            grace_timer: None,
            focus_reported: true,
            dev_tools_evidence: None,
        }
    }

    /// Declare whether focus changes will be reported through
    /// [`Observation::Focus`]. Without a focus source a release blocked on
    /// focus re-checks the page on a timer.
    pub fn set_focus_reported(&mut self, reported: bool) {
        self.focus_reported = reported;
    }

    /// Current protection phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether content is currently degraded.
    pub fn is_protected(&self) -> bool {
        self.phase.is_protected()
    }

    /// Live detector-derived state.
    pub fn state(&self) -> &ProtectionState {
        &self.state
    }

    /// Sustained conditions currently holding protection.
    pub fn active(&self) -> ThreatSet {
        self.active
    }

    /// Delays and thresholds this controller runs with.
    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    /// Evidence behind the current devtools-open state, if open.
    pub fn dev_tools_evidence(&self) -> Option<detect::DevToolsEvidence> {
        self.dev_tools_evidence
    }

    /// Whether the frame poll and devtools poll should skip this tick.
    pub fn polling_suspended(&self) -> bool {
        self.state.is_fullscreen || self.state.fullscreen_transitioning
    }

    /// Feed one detector reading.
    pub fn observe<P: Page>(&mut self, page: &mut P, observation: Observation) {
        match observation {
            Observation::DevTools(evidence) => self.observe_dev_tools(page, evidence),
            Observation::Hidden(hidden) => {
                if let Some(hook) = self.hooks.on_visibility_change.as_mut() {
                    hook(hidden);
                }
                if hidden {
                    self.raise(page, Trigger::DocumentHidden);
                } else {
                    let delay = self.timings.visibility_release;
                    self.clear(page, Trigger::DocumentHidden, delay);
                }
            }
            Observation::Focus(focused) => {
                if focused == self.state.last_focus_state {
                    return;
                }
                if focused {
                    self.state.last_focus_state = true;
                    let delay = self.timings.focus_release;
                    self.clear(page, Trigger::FocusLost, delay);
                } else if self.raise(page, Trigger::FocusLost) {
                    self.state.last_focus_state = false;
                }
            }
            Observation::PointerInside(inside) => {
                if inside {
                    let delay = self.timings.pointer_release;
                    self.clear(page, Trigger::PointerOutside, delay);
                } else {
                    self.raise(page, Trigger::PointerOutside);
                }
            }
            Observation::PixelRatio(ratio) => {
                if !detect::pixel_ratio_changed(self.state.last_pixel_ratio, ratio) {
                    return;
                }
                debug!(
                    from = self.state.last_pixel_ratio,
                    to = ratio,
                    "device pixel ratio changed"
                );
                self.state.last_pixel_ratio = ratio;
                let hold = self.timings.pixel_ratio_hold;
                self.protect(page, Trigger::PixelRatio, hold);
            }
            Observation::Fullscreen(active) => self.observe_fullscreen(page, active),
            Observation::CaptureKey => {
                let hold = self.timings.capture_key_hold;
                self.protect(page, Trigger::CaptureKey, hold);
            }
            Observation::PrintScreen => {
                let hold = self.timings.print_screen_hold;
                self.protect(page, Trigger::PrintScreen, hold);
            }
        }
    }

    /// Protect now and keep protecting for at least `hold`.
    ///
    /// A later call before the release fires pushes the release out; it
    /// never brings it forward.
    pub fn protect<P: Page>(&mut self, page: &mut P, trigger: Trigger, hold: Duration) -> bool {
        if self.suppress(page, trigger) {
            return false;
        }
        let until = page.now() + hold;
        self.hold_until = self.hold_until.max(until);
        self.enter(page, trigger);
        self.schedule_release(page);
        true
    }

    /// Handle a fired timer. Returns `false` if the timer is not ours.
    pub fn on_timer<P: Page>(&mut self, page: &mut P, id: TimerId) -> bool {
        if self.release_timer == Some(id) {
            self.release_timer = None;
            self.try_release(page);
            true
        } else if self.grace_timer == Some(id) {
            self.grace_timer = None;
            self.state.fullscreen_transitioning = false;
            self.state.is_fullscreen = detect::is_fullscreen_active(&*page);
            debug!(fullscreen = self.state.is_fullscreen, "fullscreen grace window ended");
            true
        } else {
            false
        }
    }

    /// Re-apply the inline filter after new media was inserted.
    pub fn refresh_media<P: Page>(&mut self, page: &mut P) {
        if self.is_protected() {
            if let Err(e) = page.set_media_filter(Some(MEDIA_FILTER)) {
                debug!("could not filter inserted media: {e}");
            }
        }
    }

    /// Cancel every pending timer and undo all visual effects.
    pub fn teardown<P: Page>(&mut self, page: &mut P) {
        if let Some(id) = self.release_timer.take() {
            page.clear_timer(id);
        }
        if let Some(id) = self.grace_timer.take() {
            page.clear_timer(id);
        }
        self.active = ThreatSet::default();
        self.hold_until = Duration::ZERO;
        self.state.fullscreen_transitioning = false;
        if self.is_protected() {
            self.release(page);
        }
    }

    fn observe_dev_tools<P: Page>(
        &mut self,
        page: &mut P,
        evidence: Option<detect::DevToolsEvidence>,
    ) {
        let open = evidence.is_some();
        if open == self.state.dev_tools_open {
            return;
        }
        if open && self.suppress(page, Trigger::DevTools) {
            // Left unrecorded so the next poll reports the edge again.
            return;
        }

        self.state.dev_tools_open = open;
        self.dev_tools_evidence = evidence;
        self.sink
            .emit(page.now(), ShieldEventKind::DevTools { open, evidence });
        if let Some(hook) = self.hooks.on_dev_tools_open.as_mut() {
            hook(open);
        }

        if open {
            warn!(?evidence, "developer tools detected");
            self.audit.record_devtools_detection();
            self.raise(page, Trigger::DevTools);
        } else {
            info!("developer tools closed");
            self.clear(page, Trigger::DevTools, Duration::ZERO);
        }
    }

    fn observe_fullscreen<P: Page>(&mut self, page: &mut P, active: bool) {
        let changed = active != self.state.is_fullscreen;
        self.state.is_fullscreen = active;
        self.state.fullscreen_transitioning = true;

        if let Some(id) = self.grace_timer.take() {
            page.clear_timer(id);
        }
        match page.set_timeout(self.timings.fullscreen_grace) {
            Ok(id) => self.grace_timer = Some(id),
            Err(e) => {
                debug!("could not start fullscreen grace window: {e}");
                self.state.fullscreen_transitioning = false;
            }
        }

        if changed {
            self.sink
                .emit(page.now(), ShieldEventKind::Fullscreen { active });
        }

        if active {
            // Focus bounces produced while entering fullscreen are not threats.
            self.active.remove(Trigger::FocusLost);
            self.active.remove(Trigger::PointerOutside);
            self.state.last_focus_state = true;
            if self.is_protected() && self.active.is_empty() {
                info!("fullscreen confirmed, releasing protection");
                self.hold_until = page.now();
                self.release(page);
            }
        }
    }

    /// Start a sustained condition. Returns `false` if it was suppressed.
    fn raise<P: Page>(&mut self, page: &mut P, trigger: Trigger) -> bool {
        if self.suppress(page, trigger) {
            return false;
        }
        self.active.insert(trigger);
        self.cancel_release(page);
        self.enter(page, trigger);
        true
    }

    /// End a sustained condition, releasing after `delay` once none remain.
    fn clear<P: Page>(&mut self, page: &mut P, trigger: Trigger, delay: Duration) {
        if !self.active.remove(trigger) {
            return;
        }
        if !self.is_protected() {
            return;
        }
        let until = page.now() + delay;
        self.hold_until = self.hold_until.max(until);
        self.schedule_release(page);
    }

    fn suppress<P: Page>(&mut self, page: &P, trigger: Trigger) -> bool {
        if !self.state.suppresses(trigger) {
            return false;
        }
        debug!(%trigger, "trigger suppressed by fullscreen");
        self.audit.record_suppressed_trigger();
        self.sink
            .emit(page.now(), ShieldEventKind::Suppressed { trigger });
        true
    }

    fn enter<P: Page>(&mut self, page: &mut P, trigger: Trigger) {
        if trigger.is_capture() {
            self.state.is_capture_active = true;
        }
        if self.is_protected() {
            return;
        }

        let now = page.now();
        self.phase = Phase::Protected {
            since: now,
            cause: trigger,
        };
        apply_visuals(page);
        self.audit.record_protection_episode();
        self.sink
            .emit(now, ShieldEventKind::Protected { trigger });
        info!(%trigger, "content protected");
    }

    fn schedule_release<P: Page>(&mut self, page: &mut P) {
        if !self.is_protected() || !self.active.is_empty() {
            return;
        }
        self.cancel_release(page);

        let now = page.now();
        if self.hold_until <= now {
            self.try_release(page);
            return;
        }
        match page.set_timeout(self.hold_until - now) {
            Ok(id) => self.release_timer = Some(id),
            Err(e) => {
                debug!("could not schedule release: {e}");
                self.try_release(page);
            }
        }
    }

    fn cancel_release<P: Page>(&mut self, page: &mut P) {
        if let Some(id) = self.release_timer.take() {
            page.clear_timer(id);
        }
    }

    fn try_release<P: Page>(&mut self, page: &mut P) {
        if !self.is_protected() || !self.active.is_empty() {
            return;
        }
        if page.now() < self.hold_until {
            self.schedule_release(page);
            return;
        }
        if !detect::has_focus(&*page) {
            debug!("release deferred, page has no focus");
            if self.focus_reported {
                // Held as a focus loss until focus is reported back.
                self.active.insert(Trigger::FocusLost);
                self.state.last_focus_state = false;
            } else {
                self.recheck_focus_later(page);
            }
            return;
        }
        self.release(page);
    }

    fn recheck_focus_later<P: Page>(&mut self, page: &mut P) {
        self.cancel_release(page);
        let delay = self.timings.focus_release.max(FOCUS_RECHECK_FLOOR);
        match page.set_timeout(delay) {
            Ok(id) => self.release_timer = Some(id),
            Err(e) => debug!("could not schedule focus re-check: {e}"),
        }
    }

    fn release<P: Page>(&mut self, page: &mut P) {
        self.cancel_release(page);
        let since = match self.phase {
            Phase::Protected { since, .. } => since,
            Phase::Unprotected => return,
        };

        clear_visuals(page);
        self.phase = Phase::Unprotected;
        self.state.is_capture_active = false;

        let now = page.now();
        let held_ms = now.saturating_sub(since).as_millis() as u64;
        self.sink.emit(now, ShieldEventKind::Released { held_ms });
        info!(held_ms, "content released");
    }
}

fn banner() -> Overlay {
    Overlay {
        id: BANNER_ID.to_string(),
        class: BANNER_ID.to_string(),
        lines: vec![BANNER_TEXT.to_string()],
        opacity: 1.0,
        style: "position:fixed;top:0;left:0;right:0;z-index:2147483646;\
                pointer-events:none;padding:12px;text-align:center;\
                background:#b91c1c;color:#fff;font:600 14px sans-serif"
            .to_string(),
    }
}

fn apply_visuals<P: Page>(page: &mut P) {
    if let Err(e) = page.add_body_class(BLUR_CLASS) {
        debug!("could not add blur class: {e}");
    }
    if let Err(e) = page.set_media_filter(Some(MEDIA_FILTER)) {
        debug!("could not filter media: {e}");
    }
    if let Err(e) = page.upsert_overlay(&banner()) {
        debug!("could not show warning banner: {e}");
    }
}

fn clear_visuals<P: Page>(page: &mut P) {
    if let Err(e) = page.remove_body_class(BLUR_CLASS) {
        debug!("could not remove blur class: {e}");
    }
    if let Err(e) = page.set_media_filter(None) {
        debug!("could not clear media filter: {e}");
    }
    if let Err(e) = page.remove_overlay(BANNER_ID) {
        debug!("could not remove warning banner: {e}");
    }
}
