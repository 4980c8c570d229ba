//! Input guard.
//!
//! Capture-phase interceptors for the inspection, save, print and capture
//! shortcuts, and blockers for the context menu, clipboard, drag and
//! selection. Matching is literal: a shortcut matches only when its exact
//! modifiers are held and the key (or legacy key code) is equal.

use crate::config::ProtectionConfig;
use crate::platform::{KeyEvent, PageEvent, TargetKind, Verdict};
use crate::transparency::{EventSink, SharedAuditLog, ShieldEventKind};
use std::time::Duration;
use tracing::debug;

/// Modifier requirement of a denylisted shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    None,
    Ctrl,
    /// Ctrl on Windows/Linux, Cmd on macOS
    CtrlOrMeta,
    Meta,
}

/// One entry of the shortcut denylist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortcut {
    pub name: &'static str,
    pub modifier: Modifier,
    pub shift: bool,
    pub alt: bool,
    pub key: &'static str,
    /// Legacy key code, zero when matching by key only
    pub key_code: u32,
}

impl Shortcut {
    const fn new(name: &'static str, modifier: Modifier, key: &'static str, key_code: u32) -> Self {
        Self {
            name,
            modifier,
            shift: false,
            alt: false,
            key,
            key_code,
        }
    }

    const fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    const fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    /// Whether `event` is exactly this shortcut.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        let modifier = match self.modifier {
            Modifier::None => !event.ctrl && !event.meta,
            Modifier::Ctrl => event.ctrl,
            Modifier::CtrlOrMeta => event.ctrl || event.meta,
            Modifier::Meta => event.meta,
        };
        if !modifier || event.shift != self.shift || event.alt != self.alt {
            return false;
        }
        event.key.eq_ignore_ascii_case(self.key)
            || (self.key_code != 0 && event.key_code == self.key_code)
    }
}

/// Inspection, source, save, print and capture shortcuts.
///
/// Modifiers match exactly: Ctrl+U, Ctrl+S and Ctrl+P do not cover their
/// Shift variants, so Ctrl+Shift+S (save as), Ctrl+Shift+P (private window)
/// and Ctrl+Shift+U (unicode input) stay with the browser.
pub const SHORTCUT_DENYLIST: &[Shortcut] = &[
    Shortcut::new("F12", Modifier::None, "F12", 123),
    Shortcut::new("Ctrl+Shift+I", Modifier::CtrlOrMeta, "I", 73).with_shift(),
    Shortcut::new("Ctrl+Shift+J", Modifier::CtrlOrMeta, "J", 74).with_shift(),
    Shortcut::new("Ctrl+Shift+C", Modifier::CtrlOrMeta, "C", 67).with_shift(),
    Shortcut::new("Ctrl+Shift+K", Modifier::CtrlOrMeta, "K", 75).with_shift(),
    Shortcut::new("Ctrl+Shift+M", Modifier::CtrlOrMeta, "M", 77).with_shift(),
    Shortcut::new("Ctrl+U", Modifier::Ctrl, "U", 85),
    Shortcut::new("Ctrl+S", Modifier::Ctrl, "S", 83),
    Shortcut::new("Ctrl+P", Modifier::Ctrl, "P", 80),
    Shortcut::new("PrintScreen", Modifier::None, "PrintScreen", 44),
    Shortcut::new("Alt+PrintScreen", Modifier::None, "PrintScreen", 44).with_alt(),
    Shortcut::new("Meta+Shift+S", Modifier::Meta, "S", 83).with_shift(),
];

/// First denylist entry matching `event`.
pub fn match_shortcut(event: &KeyEvent) -> Option<&'static Shortcut> {
    SHORTCUT_DENYLIST.iter().find(|s| s.matches(event))
}

/// Which blockers are armed for an activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardPolicy {
    pub shortcuts: bool,
    pub right_click: bool,
    pub copy: bool,
    pub drag: bool,
    pub selection: bool,
}

impl From<&ProtectionConfig> for GuardPolicy {
    fn from(config: &ProtectionConfig) -> Self {
        Self {
            shortcuts: config.disable_keyboard_shortcuts,
            right_click: config.disable_right_click,
            copy: config.disable_copy,
            drag: config.disable_drag,
            selection: config.disable_selection,
        }
    }
}

/// Stateless event blockers.
pub struct InputGuard {
    policy: GuardPolicy,
    sink: EventSink,
    audit: SharedAuditLog,
}

impl InputGuard {
    pub fn new(policy: GuardPolicy, sink: EventSink, audit: SharedAuditLog) -> Self {
        Self {
            policy,
            sink,
            audit,
        }
    }

    pub fn policy(&self) -> GuardPolicy {
        self.policy
    }

    /// Decide what happens to a raw input event. Events the guard does not
    /// handle pass through.
    pub fn inspect(&self, now: Duration, event: &PageEvent) -> Verdict {
        match event {
            PageEvent::KeyDown(key) if self.policy.shortcuts => match match_shortcut(key) {
                Some(shortcut) => {
                    debug!(shortcut = shortcut.name, "shortcut blocked");
                    self.audit.record_shortcut_blocked();
                    self.sink.emit(
                        now,
                        ShieldEventKind::ShortcutBlocked {
                            shortcut: shortcut.name.to_string(),
                        },
                    );
                    Verdict::BLOCK
                }
                None => Verdict::PASS,
            },
            // Media never gets a context menu, whatever the policy says.
            PageEvent::ContextMenu { target }
                if self.policy.right_click || *target == TargetKind::Media =>
            {
                self.audit.record_context_menu_blocked();
                self.sink.emit(now, ShieldEventKind::ContextMenuBlocked);
                Verdict::BLOCK
            }
            PageEvent::Copy | PageEvent::Cut if self.policy.copy => {
                self.audit.record_clipboard_blocked();
                self.sink.emit(
                    now,
                    ShieldEventKind::ClipboardBlocked {
                        cut: matches!(event, PageEvent::Cut),
                    },
                );
                Verdict::BLOCK
            }
            PageEvent::DragStart { .. } | PageEvent::Drop if self.policy.drag => {
                self.audit.record_drag_blocked();
                self.sink.emit(now, ShieldEventKind::DragBlocked);
                Verdict::BLOCK
            }
            PageEvent::SelectStart { target }
                if self.policy.selection && *target != TargetKind::FormInput =>
            {
                self.audit.record_selection_blocked();
                self.sink.emit(now, ShieldEventKind::SelectionBlocked);
                Verdict::BLOCK
            }
            _ => Verdict::PASS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transparency::create_shared_log;
    use uuid::Uuid;

    fn guard(policy: GuardPolicy) -> (InputGuard, SharedAuditLog) {
        let (sink, _receiver) = EventSink::channel(Uuid::new_v4());
        let audit = create_shared_log();
        (InputGuard::new(policy, sink, audit.clone()), audit)
    }

    fn all_on() -> GuardPolicy {
        GuardPolicy {
            shortcuts: true,
            right_click: true,
            copy: true,
            drag: true,
            selection: true,
        }
    }

    fn key_down(key: KeyEvent) -> PageEvent {
        PageEvent::KeyDown(key)
    }

    #[test]
    fn test_every_denylisted_shortcut_is_blocked() {
        let (guard, audit) = guard(all_on());
        let combos = [
            KeyEvent::key("F12").with_code(123),
            KeyEvent::key("I").ctrl().shift(),
            KeyEvent::key("i").meta().shift(),
            KeyEvent::key("J").ctrl().shift(),
            KeyEvent::key("C").ctrl().shift(),
            KeyEvent::key("K").meta().shift(),
            KeyEvent::key("M").ctrl().shift(),
            KeyEvent::key("u").ctrl(),
            KeyEvent::key("s").ctrl(),
            KeyEvent::key("p").ctrl(),
            KeyEvent::key("PrintScreen"),
            KeyEvent::key("PrintScreen").alt(),
            KeyEvent::key("S").meta().shift(),
        ];
        for combo in &combos {
            let verdict = guard.inspect(Duration::ZERO, &key_down(combo.clone()));
            assert_eq!(verdict, Verdict::BLOCK, "{combo:?} should be blocked");
        }
        assert_eq!(audit.stats().shortcuts_blocked, combos.len() as u64);
    }

    #[test]
    fn test_unlisted_shortcuts_pass() {
        let (guard, _) = guard(all_on());
        let combos = [
            KeyEvent::key("a").ctrl().with_code(65),
            KeyEvent::key("I").ctrl(),
            KeyEvent::key("c").ctrl(),
            KeyEvent::key("F5").with_code(116),
            KeyEvent::key("s").ctrl().alt(),
            KeyEvent::key("I").shift(),
        ];
        for combo in combos {
            assert_eq!(guard.inspect(Duration::ZERO, &key_down(combo)), Verdict::PASS);
        }
    }

    #[test]
    fn test_ctrl_entries_ignore_shift_variants() {
        let (guard, audit) = guard(all_on());
        for (key, code) in [("S", 83), ("P", 80), ("U", 85)] {
            let combo = KeyEvent::key(key).ctrl().shift().with_code(code);
            assert_eq!(match_shortcut(&combo), None, "{combo:?}");
            assert_eq!(guard.inspect(Duration::ZERO, &key_down(combo)), Verdict::PASS);
        }
        assert_eq!(audit.stats().shortcuts_blocked, 0);
    }

    #[test]
    fn test_key_code_fallback() {
        let (guard, _) = guard(all_on());
        let legacy = KeyEvent::key("Unidentified").ctrl().shift().with_code(73);
        assert!(guard.inspect(Duration::ZERO, &key_down(legacy)).is_blocked());
    }

    #[test]
    fn test_media_context_menu_always_blocked() {
        let mut policy = all_on();
        policy.right_click = false;
        let (guard, _) = guard(policy);

        let media = PageEvent::ContextMenu {
            target: TargetKind::Media,
        };
        let text = PageEvent::ContextMenu {
            target: TargetKind::Other,
        };
        assert_eq!(guard.inspect(Duration::ZERO, &media), Verdict::BLOCK);
        assert_eq!(guard.inspect(Duration::ZERO, &text), Verdict::PASS);
    }

    #[test]
    fn test_selection_exempts_form_inputs() {
        let (guard, _) = guard(all_on());
        let input = PageEvent::SelectStart {
            target: TargetKind::FormInput,
        };
        let body = PageEvent::SelectStart {
            target: TargetKind::Other,
        };
        assert_eq!(guard.inspect(Duration::ZERO, &input), Verdict::PASS);
        assert_eq!(guard.inspect(Duration::ZERO, &body), Verdict::BLOCK);
    }

    #[test]
    fn test_disabled_blockers_pass() {
        let (guard, audit) = guard(GuardPolicy {
            shortcuts: false,
            right_click: false,
            copy: false,
            drag: false,
            selection: false,
        });
        for event in [
            key_down(KeyEvent::key("F12")),
            PageEvent::Copy,
            PageEvent::Cut,
            PageEvent::Drop,
            PageEvent::DragStart {
                target: TargetKind::Media,
            },
        ] {
            assert_eq!(guard.inspect(Duration::ZERO, &event), Verdict::PASS);
        }
        assert_eq!(audit.stats().shortcuts_blocked, 0);
    }

    #[test]
    fn test_clipboard_and_drag_are_counted() {
        let (guard, audit) = guard(all_on());
        guard.inspect(Duration::ZERO, &PageEvent::Copy);
        guard.inspect(Duration::ZERO, &PageEvent::Cut);
        guard.inspect(
            Duration::ZERO,
            &PageEvent::DragStart {
                target: TargetKind::Other,
            },
        );

        let stats = audit.stats();
        assert_eq!(stats.clipboard_blocked, 2);
        assert_eq!(stats.drag_blocked, 1);
    }
}
