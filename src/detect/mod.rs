//! Signal detectors.
//!
//! Each detector answers one question about the page right now and reports
//! the answer as an [`Observation`]. Detectors never hold or change
//! protection state; the controller alone decides what an observation means.

pub mod devtools;
pub mod probes;

use serde::{Deserialize, Serialize};

pub use devtools::{
    is_dev_tools_likely_open, sample_dev_tools, sample_window_size, DevToolsEvidence,
};
pub use probes::{has_focus, is_fullscreen_active, is_hidden, pixel_ratio, pixel_ratio_changed};

/// A single detector reading handed to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", content = "value", rename_all = "snake_case")]
pub enum Observation {
    /// Devtools poll result; `None` means no evidence
    DevTools(Option<DevToolsEvidence>),
    /// `document.hidden` after a visibility change
    Hidden(bool),
    /// Window focus from blur/focus events or the frame poll
    Focus(bool),
    /// Pointer inside the viewport
    PointerInside(bool),
    /// Current device pixel ratio
    PixelRatio(f64),
    /// Fullscreen state after a fullscreen change
    Fullscreen(bool),
    /// The OS capture modifier went down
    CaptureKey,
    /// PrintScreen was pressed or released
    PrintScreen,
}
