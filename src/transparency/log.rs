//! Audit counters for one activation.
//!
//! Counts what the shield blocked and how often it degraded the page. Only
//! counts are kept; no event content, key identity or identity text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Statistics for the current activation.
#[derive(Debug)]
pub struct AuditLog {
    shortcuts_blocked: AtomicU64,
    clipboard_blocked: AtomicU64,
    drag_blocked: AtomicU64,
    context_menu_blocked: AtomicU64,
    selection_blocked: AtomicU64,
    protection_episodes: AtomicU64,
    devtools_detections: AtomicU64,
    suppressed_triggers: AtomicU64,
    display_media_rejections: AtomicU64,
    clipboard_scrubs: AtomicU64,
    activated_at: DateTime<Utc>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            shortcuts_blocked: AtomicU64::new(0),
            clipboard_blocked: AtomicU64::new(0),
            drag_blocked: AtomicU64::new(0),
            context_menu_blocked: AtomicU64::new(0),
            selection_blocked: AtomicU64::new(0),
            protection_episodes: AtomicU64::new(0),
            devtools_detections: AtomicU64::new(0),
            suppressed_triggers: AtomicU64::new(0),
            display_media_rejections: AtomicU64::new(0),
            clipboard_scrubs: AtomicU64::new(0),
            activated_at: Utc::now(),
        }
    }

    pub fn record_shortcut_blocked(&self) {
        self.shortcuts_blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_clipboard_blocked(&self) {
        self.clipboard_blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_drag_blocked(&self) {
        self.drag_blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_context_menu_blocked(&self) {
        self.context_menu_blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_selection_blocked(&self) {
        self.selection_blocked.fetch_add(1, Ordering::Relaxed);
    }

    /// An unprotected-to-protected transition.
    pub fn record_protection_episode(&self) {
        self.protection_episodes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_devtools_detection(&self) {
        self.devtools_detections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_suppressed_trigger(&self) {
        self.suppressed_triggers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_display_media_rejection(&self) {
        self.display_media_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_clipboard_scrub(&self) {
        self.clipboard_scrubs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> AuditStats {
        AuditStats {
            shortcuts_blocked: self.shortcuts_blocked.load(Ordering::Relaxed),
            clipboard_blocked: self.clipboard_blocked.load(Ordering::Relaxed),
            drag_blocked: self.drag_blocked.load(Ordering::Relaxed),
            context_menu_blocked: self.context_menu_blocked.load(Ordering::Relaxed),
            selection_blocked: self.selection_blocked.load(Ordering::Relaxed),
            protection_episodes: self.protection_episodes.load(Ordering::Relaxed),
            devtools_detections: self.devtools_detections.load(Ordering::Relaxed),
            suppressed_triggers: self.suppressed_triggers.load(Ordering::Relaxed),
            display_media_rejections: self.display_media_rejections.load(Ordering::Relaxed),
            clipboard_scrubs: self.clipboard_scrubs.load(Ordering::Relaxed),
            activated_at: self.activated_at,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Protection Statistics:\n\
             - Protection episodes: {}\n\
             - Devtools detections: {}\n\
             - Suppressed triggers (fullscreen): {}\n\
             - Shortcuts blocked: {}\n\
             - Copy/cut blocked: {}\n\
             - Drag/drop blocked: {}\n\
             - Context menus blocked: {}\n\
             - Selections blocked: {}\n\
             - Display-media requests rejected: {}\n\
             - Clipboard scrubs attempted: {}",
            stats.protection_episodes,
            stats.devtools_detections,
            stats.suppressed_triggers,
            stats.shortcuts_blocked,
            stats.clipboard_blocked,
            stats.drag_blocked,
            stats.context_menu_blocked,
            stats.selection_blocked,
            stats.display_media_rejections,
            stats.clipboard_scrubs,
        )
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of audit counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditStats {
    pub shortcuts_blocked: u64,
    pub clipboard_blocked: u64,
    pub drag_blocked: u64,
    pub context_menu_blocked: u64,
    pub selection_blocked: u64,
    pub protection_episodes: u64,
    pub devtools_detections: u64,
    pub suppressed_triggers: u64,
    pub display_media_rejections: u64,
    pub clipboard_scrubs: u64,
    pub activated_at: DateTime<Utc>,
}

/// Audit log shared between the shield's components.
pub type SharedAuditLog = Arc<AuditLog>;

pub fn create_shared_log() -> SharedAuditLog {
    Arc::new(AuditLog::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_counting() {
        let log = AuditLog::new();
        log.record_shortcut_blocked();
        log.record_shortcut_blocked();
        log.record_protection_episode();

        let stats = log.stats();
        assert_eq!(stats.shortcuts_blocked, 2);
        assert_eq!(stats.protection_episodes, 1);
        assert_eq!(stats.drag_blocked, 0);
    }

    #[test]
    fn test_summary_format() {
        let log = AuditLog::new();
        log.record_display_media_rejection();
        let summary = log.summary();

        assert!(summary.contains("Protection episodes: 0"));
        assert!(summary.contains("Display-media requests rejected: 1"));
    }
}
