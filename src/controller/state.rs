//! Protection state owned by the controller.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// What caused (or tried to cause) protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    DevTools,
    DocumentHidden,
    FocusLost,
    PointerOutside,
    PixelRatio,
    PrintScreen,
    CaptureKey,
}

impl Trigger {
    const ALL: [Trigger; 7] = [
        Trigger::DevTools,
        Trigger::DocumentHidden,
        Trigger::FocusLost,
        Trigger::PointerOutside,
        Trigger::PixelRatio,
        Trigger::PrintScreen,
        Trigger::CaptureKey,
    ];

    fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Triggers that fullscreen playback produces on its own: focus bounces,
    /// the pointer leaving and pixel-ratio churn.
    pub fn is_fullscreen_noise(self) -> bool {
        matches!(
            self,
            Trigger::FocusLost | Trigger::PointerOutside | Trigger::PixelRatio
        )
    }

    /// Everything except devtools belongs to the capture category.
    pub fn is_capture(self) -> bool {
        self != Trigger::DevTools
    }

    pub fn label(self) -> &'static str {
        match self {
            Trigger::DevTools => "devtools",
            Trigger::DocumentHidden => "document hidden",
            Trigger::FocusLost => "focus lost",
            Trigger::PointerOutside => "pointer outside viewport",
            Trigger::PixelRatio => "pixel ratio change",
            Trigger::PrintScreen => "PrintScreen",
            Trigger::CaptureKey => "capture key",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Set of sustained threat conditions currently in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThreatSet(u8);

impl ThreatSet {
    /// Returns `true` if the trigger was not already present.
    pub fn insert(&mut self, trigger: Trigger) -> bool {
        let absent = !self.contains(trigger);
        self.0 |= trigger.bit();
        absent
    }

    /// Returns `true` if the trigger was present.
    pub fn remove(&mut self, trigger: Trigger) -> bool {
        let present = self.contains(trigger);
        self.0 &= !trigger.bit();
        present
    }

    pub fn contains(&self, trigger: Trigger) -> bool {
        self.0 & trigger.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Trigger> {
        let set = *self;
        Trigger::ALL.into_iter().filter(move |t| set.contains(*t))
    }
}

/// The user-visible protection phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    Unprotected,
    Protected {
        /// Page time protection began
        #[serde(with = "millis")]
        since: Duration,
        /// Trigger that caused the transition
        cause: Trigger,
    },
}

impl Phase {
    pub fn is_protected(&self) -> bool {
        matches!(self, Phase::Protected { .. })
    }
}

/// Live controller state. Only the controller writes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectionState {
    pub dev_tools_open: bool,
    pub is_fullscreen: bool,
    pub fullscreen_transitioning: bool,
    pub is_capture_active: bool,
    pub last_focus_state: bool,
    pub last_pixel_ratio: f64,
}

impl ProtectionState {
    pub fn new(focused: bool, pixel_ratio: f64, fullscreen: bool) -> Self {
        Self {
            dev_tools_open: false,
            is_fullscreen: fullscreen,
            fullscreen_transitioning: false,
            is_capture_active: false,
            last_focus_state: focused,
            last_pixel_ratio: pixel_ratio,
        }
    }

    /// Whether fullscreen currently silences `trigger`.
    ///
    /// The grace window after a fullscreen change silences every trigger.
    /// Steady fullscreen silences only the noise playback produces, so
    /// capture keys still protect there.
    pub fn suppresses(&self, trigger: Trigger) -> bool {
        self.fullscreen_transitioning || (self.is_fullscreen && trigger.is_fullscreen_noise())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threat_set() {
        let mut set = ThreatSet::default();
        assert!(set.is_empty());
        assert!(set.insert(Trigger::FocusLost));
        assert!(!set.insert(Trigger::FocusLost));
        assert!(set.insert(Trigger::DevTools));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![Trigger::DevTools, Trigger::FocusLost]
        );
        assert!(set.remove(Trigger::FocusLost));
        assert!(!set.remove(Trigger::FocusLost));
        assert!(set.remove(Trigger::DevTools));
        assert!(set.is_empty());
    }

    #[test]
    fn test_fullscreen_suppression_rules() {
        let mut state = ProtectionState::new(true, 1.0, true);
        assert!(state.suppresses(Trigger::FocusLost));
        assert!(state.suppresses(Trigger::PointerOutside));
        assert!(!state.suppresses(Trigger::DocumentHidden));
        assert!(!state.suppresses(Trigger::PrintScreen));
        assert!(!state.suppresses(Trigger::CaptureKey));

        state.is_fullscreen = false;
        state.fullscreen_transitioning = true;
        assert!(state.suppresses(Trigger::DocumentHidden));
        assert!(state.suppresses(Trigger::DevTools));
        assert!(state.suppresses(Trigger::CaptureKey));
        assert!(state.suppresses(Trigger::PrintScreen));
    }
}
