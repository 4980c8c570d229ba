//! Developer-tools heuristic.
//!
//! Two indirect signals: a docked devtools pane makes the outer window much
//! larger than the viewport, and an attached debugger stretches the time
//! across a breakpoint statement. Neither is proof.

use crate::config::Timings;
use crate::platform::Page;
use serde::{Deserialize, Serialize};

/// Why the heuristic reported devtools as open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevToolsEvidence {
    /// Outer/inner width or height differ by more than the threshold
    WindowSize,
    /// The breakpoint statement paused for longer than the threshold
    DebuggerPause,
}

/// Returns the evidence if devtools look open, `None` otherwise.
///
/// The size check runs first so the debugger check (which actually pauses
/// when a debugger is attached) is only taken when needed.
pub fn sample_dev_tools<P: Page>(page: &mut P, timings: &Timings) -> Option<DevToolsEvidence> {
    if let Some(evidence) = sample_window_size(&*page, timings) {
        return Some(evidence);
    }

    match page.debugger_pause() {
        Some(pause) if pause > timings.debugger_pause_threshold => {
            Some(DevToolsEvidence::DebuggerPause)
        }
        _ => None,
    }
}

/// The size check alone. Never pauses, so it is safe on every resize.
pub fn sample_window_size<P: Page>(page: &P, timings: &Timings) -> Option<DevToolsEvidence> {
    let metrics = page.window_metrics()?;
    let threshold = timings.devtools_size_threshold;
    (metrics.width_delta() > threshold || metrics.height_delta() > threshold)
        .then_some(DevToolsEvidence::WindowSize)
}

/// `true` when [`sample_dev_tools`] finds any evidence.
pub fn is_dev_tools_likely_open<P: Page>(page: &mut P, timings: &Timings) -> bool {
    sample_dev_tools(page, timings).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{HeadlessPage, WindowMetrics};
    use std::time::Duration;

    fn docked(width_delta: f64, height_delta: f64) -> WindowMetrics {
        WindowMetrics {
            outer_width: 1280.0 + width_delta,
            outer_height: 800.0 + height_delta,
            inner_width: 1280.0,
            inner_height: 800.0,
        }
    }

    #[test]
    fn test_closed_by_default() {
        let mut page = HeadlessPage::new();
        assert!(!is_dev_tools_likely_open(&mut page, &Timings::default()));
    }

    #[test]
    fn test_size_threshold_is_exclusive() {
        let timings = Timings::default();
        let mut page = HeadlessPage::new();

        page.set_metrics(docked(160.0, 0.0));
        assert!(!is_dev_tools_likely_open(&mut page, &timings));

        page.set_metrics(docked(161.0, 0.0));
        assert_eq!(
            sample_dev_tools(&mut page, &timings),
            Some(DevToolsEvidence::WindowSize)
        );

        page.set_metrics(docked(0.0, 300.0));
        assert!(is_dev_tools_likely_open(&mut page, &timings));
    }

    #[test]
    fn test_window_size_ignores_debugger() {
        let timings = Timings::default();
        let mut page = HeadlessPage::new();
        page.set_debugger_pause(Duration::from_millis(250));
        assert_eq!(sample_window_size(&page, &timings), None);

        page.set_metrics(docked(300.0, 0.0));
        assert_eq!(
            sample_window_size(&page, &timings),
            Some(DevToolsEvidence::WindowSize)
        );
    }

    #[test]
    fn test_debugger_pause() {
        let timings = Timings::default();
        let mut page = HeadlessPage::new();

        page.set_debugger_pause(Duration::from_millis(100));
        assert!(!is_dev_tools_likely_open(&mut page, &timings));

        page.set_debugger_pause(Duration::from_millis(250));
        assert_eq!(
            sample_dev_tools(&mut page, &timings),
            Some(DevToolsEvidence::DebuggerPause)
        );
    }
}
