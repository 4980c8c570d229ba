//! Content Shield - best-effort client-side content protection.
//!
//! Detects likely attempts to inspect or capture on-screen content and
//! degrades the page (blur, darken, warning banner) until the condition
//! clears, with an optional traceable identity watermark.
//!
//! # What this is not
//!
//! - **Not DRM**: nothing here is cryptographic or enforced by a server
//! - **Not a guarantee**: OS-level capture can bypass every heuristic
//! - **A deterrent**: false positives (a brief blur on alt-tab) are accepted
//!   in exchange for reacting before a screenshot tool samples the screen
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Content Shield                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌──────────────┐   ┌─────────────┐        │
//! │  │  Detectors  │──▶│  Protection  │──▶│ blur class, │        │
//! │  │ (probes +   │   │  Controller  │   │ media filter│        │
//! │  │  polls)     │   │ (debounced)  │   │ and banner  │        │
//! │  └─────────────┘   └──────────────┘   └─────────────┘        │
//! │         ▲                  ▲                                  │
//! │  ┌─────────────┐   ┌──────────────┐   ┌─────────────┐        │
//! │  │    Page     │──▶│ Input Guard  │   │  Watermark  │        │
//! │  │ (web/head-  │   │ (capture-    │   │  Overlay    │        │
//! │  │  less)      │   │  phase)      │   │             │        │
//! │  └─────────────┘   └──────────────┘   └─────────────┘        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use content_shield::platform::{HeadlessPage, KeyEvent, PageEvent, Signal};
//! use content_shield::{init_security_protection, ProtectionConfig};
//!
//! let mut shield = init_security_protection(HeadlessPage::new(), ProtectionConfig::default());
//!
//! let verdict = shield.handle(Signal::Event(PageEvent::KeyDown(KeyEvent::key("PrintScreen"))));
//! assert!(verdict.is_blocked());
//! assert!(shield.is_protected());
//!
//! shield.dispose();
//! assert_eq!(shield.page().listener_count(), 0);
//! ```

pub mod config;
pub mod controller;
pub mod detect;
pub mod guard;
pub mod platform;
pub mod shield;
pub mod sim;
pub mod transparency;
pub mod watermark;

// Re-export key types at crate root for convenience
pub use config::{ConfigError, Hooks, ProtectionConfig, Timings, WatermarkStyle};
pub use controller::{Phase, ProtectionController, ProtectionState, Trigger};
pub use detect::{is_dev_tools_likely_open, is_fullscreen_active, Observation};
pub use guard::{match_shortcut, InputGuard, Shortcut, SHORTCUT_DENYLIST};
pub use platform::{HeadlessPage, Page, PageError, Signal, Verdict};
pub use shield::{init_security_protection, Shield, ShieldStatus};
pub use sim::{Scenario, ScenarioError, ScenarioReport, Simulation};
pub use transparency::{AuditLog, AuditStats, ShieldEvent, ShieldEventKind};
pub use watermark::{add_watermark, remove_watermark, Identity, WatermarkOverlay};

#[cfg(target_arch = "wasm32")]
pub use platform::{WebPage, WebShield};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Notice that can be shown to users of a protected page.
pub const PROTECTION_NOTICE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║              CONTENT SHIELD - PROTECTION NOTICE                  ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This page hides its content while capture looks likely.         ║
║                                                                  ║
║  ✓ WHAT BLURS THE PAGE:                                          ║
║    • Switching tabs or windows                                   ║
║    • Pressing PrintScreen or the screenshot key combination      ║
║    • Opening developer tools                                     ║
║                                                                  ║
║  ✗ WHAT IS NEVER RECORDED:                                       ║
║    • Which keys you press (blocked shortcuts are only counted)   ║
║    • Anything you type or copy                                   ║
║    • Your screen outside this page                               ║
║                                                                  ║
║  Fullscreen video playback is not interrupted. A faint           ║
║  watermark may identify your account on captured images.         ║
║                                                                  ║
║  Try the behavior without a browser with:                        ║
║    content-shield simulate printscreen                           ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protection_notice_contents() {
        assert!(PROTECTION_NOTICE.contains("PROTECTION NOTICE"));
        assert!(PROTECTION_NOTICE.contains("NEVER RECORDED"));
        assert!(PROTECTION_NOTICE.contains("content-shield simulate"));
    }
}
