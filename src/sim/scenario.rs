//! Scripted scenarios for the simulator.
//!
//! A scenario is a list of timed steps run against a fresh shield. Steps
//! may assert the protected state at their time; the report lists every
//! assertion and the full event stream.

use super::Simulation;
use crate::config::ProtectionConfig;
use crate::platform::{KeyEvent, TargetKind};
use crate::transparency::{AuditStats, ShieldEvent};
use crate::watermark::Identity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Names accepted by [`Scenario::builtin`].
pub const BUILTIN_SCENARIOS: &[&str] = &[
    "printscreen",
    "tab-switch",
    "alt-tab",
    "devtools",
    "fullscreen",
    "snipping",
];

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("unknown scenario '{0}' (available: {list})", list = BUILTIN_SCENARIOS.join(", "))]
    Unknown(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Something that happens to the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    KeyDown(KeyEvent),
    KeyUp(KeyEvent),
    Blur,
    Focus,
    Hide,
    Show,
    EnterFullscreen,
    ExitFullscreen,
    OpenDevtools,
    CloseDevtools,
    PixelRatio { ratio: f64 },
    PointerLeave,
    PointerEnter,
    RequestDisplayMedia,
    Copy,
    ContextMenu {
        #[serde(default)]
        target: TargetKind,
    },
    InsertMedia { tag: String },
    Login(Identity),
    Logout,
    /// Assert the protected state at this point
    Expect { protected: bool },
    Dispose,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub at_ms: u64,
    pub action: Action,
}

impl Step {
    pub fn new(at_ms: u64, action: Action) -> Self {
        Self { at_ms, action }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: ProtectionConfig,
    pub steps: Vec<Step>,
    /// Extra time simulated after the last step
    #[serde(default)]
    pub settle_ms: u64,
}

/// One evaluated `Expect` step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expectation {
    pub at_ms: u64,
    pub expected: bool,
    pub actual: bool,
}

impl Expectation {
    pub fn passed(&self) -> bool {
        self.expected == self.actual
    }
}

/// Outcome of [`Scenario::run`].
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub passed: bool,
    pub expectations: Vec<Expectation>,
    pub clipboard_writes: usize,
    pub audit: AuditStats,
    pub events: Vec<ShieldEvent>,
}

impl ScenarioReport {
    pub fn failures(&self) -> impl Iterator<Item = &Expectation> {
        self.expectations.iter().filter(|e| !e.passed())
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Scenario '{}': {}",
            self.name,
            if self.passed { "PASS" } else { "FAIL" }
        )?;
        for event in &self.events {
            let kind = serde_json::to_string(&event.kind).unwrap_or_default();
            writeln!(f, "  {:>6} ms  {}", event.at_ms, kind)?;
        }
        for expectation in &self.expectations {
            writeln!(
                f,
                "  expect protected={} at {} ms: {}",
                expectation.expected,
                expectation.at_ms,
                if expectation.passed() { "ok" } else { "FAILED" }
            )?;
        }
        write!(f, "  clipboard writes: {}", self.clipboard_writes)
    }
}

fn key(name: &str, code: u32) -> KeyEvent {
    KeyEvent::key(name).with_code(code)
}

fn expect(at_ms: u64, protected: bool) -> Step {
    Step::new(at_ms, Action::Expect { protected })
}

impl Scenario {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            config: ProtectionConfig::default(),
            steps,
            settle_ms: 0,
        }
    }

    fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// One of the built-in scenarios.
    pub fn builtin(name: &str) -> Result<Self, ScenarioError> {
        use Action::*;

        let scenario = match name {
            "printscreen" => Scenario::new(
                name,
                vec![
                    Step::new(0, KeyDown(key("PrintScreen", 44))),
                    expect(0, true),
                    expect(1400, true),
                    expect(1500, false),
                ],
            )
            .describe("PrintScreen blurs in the same tick and releases after the hold"),
            "tab-switch" => Scenario::new(
                name,
                vec![
                    Step::new(0, Hide),
                    expect(0, true),
                    Step::new(2000, Show),
                    expect(2100, true),
                    expect(2500, false),
                ],
            )
            .describe("A hidden tab stays blurred until shortly after it is shown again"),
            "alt-tab" => Scenario::new(
                name,
                vec![
                    Step::new(0, Blur),
                    expect(0, true),
                    Step::new(1000, Focus),
                    expect(1200, true),
                    expect(1300, false),
                ],
            )
            .describe("Losing OS focus blurs until focus has been back for a moment"),
            "devtools" => Scenario::new(
                name,
                vec![
                    Step::new(0, OpenDevtools),
                    expect(0, true),
                    expect(2500, true),
                    Step::new(3000, CloseDevtools),
                    expect(3000, false),
                ],
            )
            .describe("A docked devtools pane blurs until it is closed"),
            "fullscreen" => Scenario::new(
                name,
                vec![
                    Step::new(0, EnterFullscreen),
                    Step::new(100, Blur),
                    expect(100, false),
                    Step::new(200, Focus),
                    Step::new(1000, Blur),
                    expect(1000, false),
                    Step::new(1200, Focus),
                    Step::new(2000, KeyDown(key("PrintScreen", 44))),
                    expect(2000, true),
                    expect(3500, false),
                    Step::new(4000, ExitFullscreen),
                    Step::new(4100, KeyDown(key("PrintScreen", 44))),
                    expect(4100, false),
                    Step::new(4600, KeyDown(key("PrintScreen", 44))),
                    expect(4600, true),
                ],
            )
            .describe("Fullscreen playback does not blur, but PrintScreen does once the transition settles"),
            "snipping" => Scenario::new(
                name,
                vec![
                    Step::new(0, KeyDown(key("Meta", 91).meta())),
                    expect(0, true),
                    Step::new(50, KeyDown(key("S", 83).meta().shift())),
                    Step::new(100, Blur),
                    expect(1500, true),
                    Step::new(3000, Focus),
                    expect(3200, true),
                    expect(3300, false),
                ],
            )
            .describe("Win+Shift+S blurs before the snipping overlay samples the screen"),
            other => return Err(ScenarioError::Unknown(other.to_string())),
        };
        Ok(scenario)
    }

    /// Load a scenario from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| ScenarioError::Parse(e.to_string()))
    }

    /// Log `identity` in before the first step.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.config.enable_watermark = true;
        self.steps.insert(0, Step::new(0, Action::Login(identity)));
        self
    }

    /// Run against a fresh headless page.
    pub fn run(self) -> ScenarioReport {
        let Scenario {
            name,
            config,
            mut steps,
            settle_ms,
            ..
        } = self;
        steps.sort_by_key(|s| s.at_ms);

        let mut sim = Simulation::new(config);
        let mut expectations = Vec::new();

        for step in steps {
            sim.advance_to(Duration::from_millis(step.at_ms));
            match step.action {
                Action::Expect { protected } => expectations.push(Expectation {
                    at_ms: step.at_ms,
                    expected: protected,
                    actual: sim.is_protected(),
                }),
                action => apply(&mut sim, action),
            }
        }
        sim.advance(Duration::from_millis(settle_ms));

        let clipboard_writes = sim.page().clipboard_writes();
        let audit = sim.shield().audit().stats();
        sim.dispose();
        let events = sim.drain_events();

        ScenarioReport {
            passed: expectations.iter().all(Expectation::passed),
            name,
            expectations,
            clipboard_writes,
            audit,
            events,
        }
    }
}

fn apply(sim: &mut Simulation, action: Action) {
    match action {
        Action::KeyDown(key) => {
            sim.key_down(key);
        }
        Action::KeyUp(key) => {
            sim.key_up(key);
        }
        Action::Blur => sim.blur(),
        Action::Focus => sim.focus(),
        Action::Hide => sim.hide(),
        Action::Show => sim.show(),
        Action::EnterFullscreen => sim.enter_fullscreen(),
        Action::ExitFullscreen => sim.exit_fullscreen(),
        Action::OpenDevtools => sim.open_devtools(),
        Action::CloseDevtools => sim.close_devtools(),
        Action::PixelRatio { ratio } => sim.set_pixel_ratio(ratio),
        Action::PointerLeave => sim.pointer_leave(),
        Action::PointerEnter => sim.pointer_enter(),
        Action::RequestDisplayMedia => {
            sim.request_display_media();
        }
        Action::Copy => {
            sim.copy();
        }
        Action::ContextMenu { target } => {
            sim.context_menu(target);
        }
        Action::InsertMedia { tag } => sim.insert_media(&tag),
        Action::Login(identity) => sim.login(identity),
        Action::Logout => sim.logout(),
        Action::Dispose => sim.dispose(),
        Action::Expect { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transparency::ShieldEventKind;

    #[test]
    fn test_every_builtin_passes() {
        for name in BUILTIN_SCENARIOS {
            let report = Scenario::builtin(name).unwrap().run();
            assert!(report.passed, "{report}");
        }
    }

    #[test]
    fn test_unknown_builtin() {
        let err = Scenario::builtin("screen-recorder").unwrap_err();
        assert!(err.to_string().contains("printscreen"));
    }

    #[test]
    fn test_printscreen_scrubs_once() {
        let report = Scenario::builtin("printscreen").unwrap().run();
        assert_eq!(report.clipboard_writes, 1);
        assert_eq!(report.audit.protection_episodes, 1);
    }

    #[test]
    fn test_failed_expectation_is_reported() {
        let scenario = Scenario::new(
            "wrong",
            vec![Step::new(0, Action::Blur), expect(10, false)],
        );
        let report = scenario.run();
        assert!(!report.passed);
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn test_scenario_from_json() {
        let json = r#"{
            "name": "copy",
            "config": { "disable_copy": true },
            "steps": [
                { "at_ms": 0, "action": { "type": "copy" } },
                { "at_ms": 10, "action": { "type": "key_down", "key": "u", "ctrl": true } },
                { "at_ms": 20, "action": { "type": "login", "email": "ada@example.com" } },
                { "at_ms": 30, "action": { "type": "expect", "protected": false } }
            ]
        }"#;
        let scenario: Scenario = serde_json::from_str(json).unwrap();
        let report = scenario.run();

        assert!(report.passed);
        assert_eq!(report.audit.clipboard_blocked, 1);
        assert_eq!(report.audit.shortcuts_blocked, 1);
        assert!(matches!(
            report.events.last().map(|e| &e.kind),
            Some(ShieldEventKind::Disposed)
        ));
    }

    #[test]
    fn test_identity_renders_watermark() {
        let report = Scenario::builtin("alt-tab")
            .unwrap()
            .with_identity(Identity::new("ada@example.com"))
            .run();
        assert!(report.events.iter().any(|e| matches!(
            &e.kind,
            ShieldEventKind::WatermarkRendered { text } if text.starts_with("ada@example.com")
        )));
    }
}
