//! Integration tests for content protection on a simulated page

use content_shield::controller::BLUR_CLASS;
use content_shield::platform::{HeadlessPage, KeyEvent, TargetKind, Verdict};
use content_shield::shield::PROTECTED_CLASS;
use content_shield::sim::Simulation;
use content_shield::watermark::WATERMARK_ID;
use content_shield::{
    add_watermark, remove_watermark, Hooks, Identity, ProtectionConfig, Scenario, ShieldEventKind,
    SHORTCUT_DENYLIST,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn test_watermark_is_idempotent() {
    let mut page = HeadlessPage::new();

    add_watermark(&mut page, "alice@example.com").expect("first add");
    add_watermark(&mut page, "bob@example.com").expect("second add");
    assert_eq!(page.overlay_count(WATERMARK_ID), 1);

    let overlay = page.overlay(WATERMARK_ID).expect("watermark mounted");
    assert!(overlay.lines.iter().all(|l| l == "bob@example.com"));

    assert!(remove_watermark(&mut page).expect("remove"));
    assert!(!remove_watermark(&mut page).expect("second remove"));
    assert_eq!(page.overlay_count(WATERMARK_ID), 0);
}

#[test]
fn test_dispose_removes_everything_and_is_idempotent() {
    let config = ProtectionConfig {
        enable_watermark: true,
        watermark_text: "internal".to_string(),
        production: true,
        ..ProtectionConfig::default()
    };
    let mut sim = Simulation::new(config);
    sim.blur();
    assert!(sim.is_protected());
    assert!(sim.page().listener_count() > 0);
    assert!(sim.page().console_silenced());

    sim.dispose();
    sim.dispose();

    let page = sim.page();
    assert_eq!(page.listener_count(), 0);
    assert_eq!(page.pending_timer_count(), 0);
    assert_eq!(page.pending_frame_count(), 0);
    assert!(!page.has_body_class(BLUR_CLASS));
    assert!(!page.has_body_class(PROTECTED_CLASS));
    assert_eq!(page.overlay_count(WATERMARK_ID), 0);
    assert!(!page.display_media_blocked());
    assert!(!page.console_silenced());

    let disposed = sim
        .drain_events()
        .into_iter()
        .filter(|e| e.kind == ShieldEventKind::Disposed)
        .count();
    assert_eq!(disposed, 1);
}

#[test]
fn test_rapid_blur_focus_is_debounced() {
    let mut sim = Simulation::new(ProtectionConfig::default());

    sim.blur();
    sim.advance(ms(100));
    sim.focus();
    sim.advance(ms(100));
    sim.blur();
    sim.advance(ms(100));
    sim.focus();

    // Never released in between.
    sim.advance(ms(299));
    assert!(sim.is_protected());
    sim.advance(ms(1));
    assert!(!sim.is_protected());

    let protected = sim
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e.kind, ShieldEventKind::Protected { .. }))
        .count();
    assert_eq!(protected, 1);
}

#[test]
fn test_fullscreen_playback_is_not_blurred() {
    let mut sim = Simulation::new(ProtectionConfig::default());
    sim.enter_fullscreen();
    sim.advance(ms(100));

    sim.blur();
    assert!(!sim.is_protected());
    sim.focus();

    sim.advance(ms(1000));
    sim.blur();
    sim.pointer_leave();
    assert!(!sim.is_protected());
    assert!(!sim.page().has_body_class(BLUR_CLASS));
}

#[test]
fn test_print_screen_still_protects_in_fullscreen() {
    let mut sim = Simulation::new(ProtectionConfig::default());
    sim.enter_fullscreen();
    sim.advance(ms(100));

    // Still inside the transition window.
    sim.key_down(KeyEvent::key("PrintScreen").with_code(44));
    assert!(!sim.is_protected());

    sim.advance(ms(1000));
    sim.key_down(KeyEvent::key("PrintScreen").with_code(44));
    assert!(sim.is_protected());
}

#[test]
fn test_devtools_only_config_releases_after_refocus() {
    let mut sim = Simulation::new(ProtectionConfig {
        enable_visibility_protection: false,
        enable_screen_capture_protection: false,
        ..ProtectionConfig::default()
    });
    sim.open_devtools();
    assert!(sim.is_protected());

    sim.shield_mut().page_mut().set_focused(false);
    sim.close_devtools();
    sim.advance(ms(5000));
    assert!(sim.is_protected());

    sim.focus();
    sim.advance(ms(60_000));
    assert!(!sim.is_protected());
}

#[test]
fn test_devtools_hook_fires_once_across_polls() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&calls);
    let config = ProtectionConfig::default()
        .with_hooks(Hooks::default().on_dev_tools_open(move |open| seen.borrow_mut().push(open)));

    let mut sim = Simulation::new(config);
    sim.shield_mut().page_mut().set_debugger_pause(ms(400));
    sim.advance(ms(3500));
    assert!(sim.is_protected());
    assert_eq!(*calls.borrow(), vec![true]);

    sim.shield_mut().page_mut().set_debugger_pause(Duration::ZERO);
    sim.advance(ms(1000));
    assert!(!sim.is_protected());
    assert_eq!(*calls.borrow(), vec![true, false]);
}

#[test]
fn test_visibility_hook_reports_hidden_flag() {
    let hidden = Rc::new(Cell::new(None));
    let seen = Rc::clone(&hidden);
    let config = ProtectionConfig::default()
        .with_hooks(Hooks::default().on_visibility_change(move |h| seen.set(Some(h))));

    let mut sim = Simulation::new(config);
    sim.hide();
    assert_eq!(hidden.get(), Some(true));
    sim.show();
    assert_eq!(hidden.get(), Some(false));
}

#[test]
fn test_denylisted_shortcuts_are_blocked() {
    let mut sim = Simulation::new(ProtectionConfig {
        enable_screen_capture_protection: false,
        ..ProtectionConfig::default()
    });

    let blocked = [
        KeyEvent::key("F12").with_code(123),
        KeyEvent::key("I").ctrl().shift(),
        KeyEvent::key("i").meta().shift(),
        KeyEvent::key("u").ctrl(),
        KeyEvent::key("s").ctrl(),
        KeyEvent::key("p").ctrl(),
    ];
    for key in &blocked {
        assert_eq!(sim.key_down(key.clone()), Verdict::BLOCK, "{key:?}");
    }
    assert_eq!(
        sim.shield().audit().stats().shortcuts_blocked,
        blocked.len() as u64
    );
}

#[test]
fn test_ordinary_shortcuts_pass() {
    let mut sim = Simulation::new(ProtectionConfig::default());

    assert_eq!(sim.key_down(KeyEvent::key("a").ctrl()), Verdict::PASS);
    assert_eq!(sim.key_down(KeyEvent::key("c").ctrl()), Verdict::PASS);
    assert_eq!(sim.key_down(KeyEvent::key("u")), Verdict::PASS);
    assert!(!sim.is_protected());
    assert!(SHORTCUT_DENYLIST.len() >= 12);
}

#[test]
fn test_media_context_menu_blocked_even_when_allowed() {
    let mut sim = Simulation::new(ProtectionConfig {
        disable_right_click: false,
        ..ProtectionConfig::default()
    });

    assert_eq!(sim.context_menu(TargetKind::Other), Verdict::PASS);
    assert_eq!(sim.context_menu(TargetKind::Media), Verdict::BLOCK);
}

#[test]
fn test_print_screen_lifecycle() {
    let mut sim = Simulation::new(ProtectionConfig::default());

    let verdict = sim.key_down(KeyEvent::key("PrintScreen").with_code(44));
    assert!(verdict.is_blocked());
    assert!(sim.is_protected());
    sim.key_up(KeyEvent::key("PrintScreen").with_code(44));

    assert_eq!(sim.page().clipboard_writes(), 1);
    assert_eq!(sim.page().clipboard(), "Protected content");

    sim.advance(ms(1499));
    assert!(sim.is_protected());
    sim.advance(ms(1));
    assert!(!sim.is_protected());
}

#[test]
fn test_tab_switch_protects_until_shown() {
    let mut sim = Simulation::new(ProtectionConfig::default());
    sim.hide();
    assert!(sim.is_protected());

    sim.advance(ms(5000));
    assert!(sim.is_protected());

    sim.show();
    sim.advance(ms(499));
    assert!(sim.is_protected());
    sim.advance(ms(1));
    assert!(!sim.is_protected());
}

#[test]
fn test_display_media_request_is_rejected() {
    let mut sim = Simulation::new(ProtectionConfig::default());
    assert!(sim.request_display_media());
    assert_eq!(sim.shield().audit().stats().display_media_rejections, 1);

    sim.dispose();
    assert!(!sim.request_display_media());
}

#[test]
fn test_builtin_scenarios_pass() {
    for name in content_shield::sim::scenario::BUILTIN_SCENARIOS {
        let report = Scenario::builtin(name).expect("builtin").run();
        assert!(report.passed, "{report}");
    }
}

#[test]
fn test_identity_watermark_follows_login() {
    let mut sim = Simulation::new(ProtectionConfig {
        enable_watermark: true,
        ..ProtectionConfig::default()
    });
    sim.login(Identity::new("carol@example.com").with_id("u-42"));

    let overlay = sim.page().overlay(WATERMARK_ID).expect("watermark mounted");
    assert!(overlay.lines[0].starts_with("carol@example.com - "));
    assert_eq!(sim.page().overlay_count(WATERMARK_ID), 1);

    sim.logout();
    let overlay = sim.page().overlay(WATERMARK_ID).expect("watermark mounted");
    assert!(overlay.lines[0].starts_with("Protected Content - "));
}
