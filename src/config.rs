//! Configuration for the content shield.
//!
//! A [`ProtectionConfig`] is a snapshot: it is moved into the shield on
//! activation and never changes afterwards. Activating with different
//! options means disposing the old shield and creating a new one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options for one activation of the shield.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionConfig {
    /// Poll the devtools heuristic and protect while it reports open
    pub disable_dev_tools: bool,
    /// Block the context menu everywhere (media is always blocked)
    pub disable_right_click: bool,
    /// Block the inspection/save/print/capture shortcut denylist
    pub disable_keyboard_shortcuts: bool,
    /// Block copy and cut
    pub disable_copy: bool,
    /// Block dragstart and drop, and lock media dragging
    pub disable_drag: bool,
    /// Block selectstart outside form inputs. Off by default so forms stay usable.
    pub disable_selection: bool,
    /// Silence the console when `production` is set
    pub disable_console_in_production: bool,
    /// Focus polling, pixel-ratio probe, capture keys and display-media blocking
    pub enable_screen_capture_protection: bool,
    /// Protect while the document is hidden or the window lost focus
    pub enable_visibility_protection: bool,
    pub enable_watermark: bool,
    /// Watermark text used when no identity is known
    pub watermark_text: String,
    /// The host's "build is production" flag
    pub production: bool,
    /// Text written over the clipboard after a PrintScreen press
    pub clipboard_placeholder: String,
    pub timings: Timings,
    pub watermark: WatermarkStyle,
    #[serde(skip)]
    pub hooks: Hooks,
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            disable_dev_tools: true,
            disable_right_click: true,
            disable_keyboard_shortcuts: true,
            disable_copy: true,
            disable_drag: true,
            disable_selection: false,
            disable_console_in_production: true,
            enable_screen_capture_protection: true,
            enable_visibility_protection: true,
            enable_watermark: false,
            watermark_text: String::new(),
            production: !cfg!(debug_assertions),
            clipboard_placeholder: "Protected content".to_string(),
            timings: Timings::default(),
            watermark: WatermarkStyle::default(),
            hooks: Hooks::default(),
        }
    }
}

impl ProtectionConfig {
    /// Load configuration from a JSON file, falling back to defaults when
    /// the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: ProtectionConfig = serde_json::from_str(&content)
                .map_err(|e| ConfigError::Parse(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from [`ProtectionConfig::config_path`].
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(&Self::config_path())
    }

    /// Save configuration as pretty JSON. Hooks are not persisted.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Default location of the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("content-shield")
            .join("config.json")
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Whether console silencing applies to this activation.
    pub fn silences_console(&self) -> bool {
        self.disable_console_in_production && self.production
    }
}

/// Delays, poll periods and heuristic thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    #[serde(with = "millis")]
    pub devtools_poll: Duration,
    #[serde(with = "millis")]
    pub pixel_ratio_poll: Duration,
    /// Release delay after the window regains focus
    #[serde(with = "millis")]
    pub focus_release: Duration,
    /// Release delay after the document becomes visible
    #[serde(with = "millis")]
    pub visibility_release: Duration,
    /// Confirm delay after the pointer re-enters the viewport
    #[serde(with = "millis")]
    pub pointer_release: Duration,
    /// Minimum protection after a PrintScreen press
    #[serde(with = "millis")]
    pub print_screen_hold: Duration,
    /// Minimum protection after the capture modifier goes down
    #[serde(with = "millis")]
    pub capture_key_hold: Duration,
    /// Minimum protection after a device pixel ratio change
    #[serde(with = "millis")]
    pub pixel_ratio_hold: Duration,
    /// Every trigger is ignored this long after a fullscreen change
    #[serde(with = "millis")]
    pub fullscreen_grace: Duration,
    /// Outer/inner window size difference that suggests docked devtools
    pub devtools_size_threshold: f64,
    #[serde(with = "millis")]
    pub debugger_pause_threshold: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            devtools_poll: Duration::from_millis(1000),
            pixel_ratio_poll: Duration::from_millis(50),
            focus_release: Duration::from_millis(300),
            visibility_release: Duration::from_millis(500),
            pointer_release: Duration::from_millis(300),
            print_screen_hold: Duration::from_millis(1500),
            capture_key_hold: Duration::from_millis(1000),
            pixel_ratio_hold: Duration::from_millis(800),
            fullscreen_grace: Duration::from_millis(500),
            devtools_size_threshold: 160.0,
            debugger_pause_threshold: Duration::from_millis(100),
        }
    }
}

/// How the watermark is rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkStyle {
    /// Supports `{email}`, `{id}` and `{date}` placeholders
    pub template: String,
    /// Number of repeated copies tiled across the viewport
    pub tiles: usize,
    pub opacity: f64,
    /// IANA timezone for the date stamp; UTC when unset or unknown
    pub timezone: Option<String>,
}

impl Default for WatermarkStyle {
    fn default() -> Self {
        Self {
            template: "{email} - {date}".to_string(),
            tiles: 6,
            opacity: 0.08,
            timezone: None,
        }
    }
}

type DevToolsHook = Box<dyn FnMut(bool)>;
type VisibilityHook = Box<dyn FnMut(bool)>;

/// Host callbacks.
#[derive(Default)]
pub struct Hooks {
    /// Called on devtools open/close transitions only
    pub on_dev_tools_open: Option<DevToolsHook>,
    /// Called on every visibility change with `document.hidden`
    pub on_visibility_change: Option<VisibilityHook>,
}

impl Hooks {
    pub fn on_dev_tools_open(mut self, hook: impl FnMut(bool) + 'static) -> Self {
        self.on_dev_tools_open = Some(Box::new(hook));
        self
    }

    pub fn on_visibility_change(mut self, hook: impl FnMut(bool) + 'static) -> Self {
        self.on_visibility_change = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_dev_tools_open", &self.on_dev_tools_open.is_some())
            .field("on_visibility_change", &self.on_visibility_change.is_some())
            .finish()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialize error: {0}")]
    Serialize(String),
}

/// Serde support for Duration as whole milliseconds.
mod millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProtectionConfig::default();
        assert!(config.disable_dev_tools);
        assert!(config.disable_keyboard_shortcuts);
        assert!(!config.disable_selection);
        assert!(!config.enable_watermark);
        assert_eq!(config.timings.print_screen_hold, Duration::from_millis(1500));
        assert_eq!(config.timings.fullscreen_grace, Duration::from_millis(500));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "disable_selection": true,
            "timings": { "focus_release": 450 }
        }"#;
        let config: ProtectionConfig = serde_json::from_str(json).unwrap();
        assert!(config.disable_selection);
        assert!(config.disable_copy);
        assert_eq!(config.timings.focus_release, Duration::from_millis(450));
        assert_eq!(config.timings.visibility_release, Duration::from_millis(500));
        assert!(config.hooks.on_dev_tools_open.is_none());
    }

    #[test]
    fn test_console_gate_needs_production() {
        let mut config = ProtectionConfig::default();
        config.production = false;
        assert!(!config.silences_console());
        config.production = true;
        assert!(config.silences_console());
        config.disable_console_in_production = false;
        assert!(!config.silences_console());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("content-shield-{}", uuid::Uuid::new_v4()))
            .join("config.json");

        let mut config = ProtectionConfig::default();
        config.enable_watermark = true;
        config.watermark.tiles = 12;
        config.save(&path).unwrap();

        let loaded = ProtectionConfig::load(&path).unwrap();
        assert!(loaded.enable_watermark);
        assert_eq!(loaded.watermark.tiles, 12);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_hooks_debug_hides_closures() {
        let hooks = Hooks::default().on_dev_tools_open(|_| {});
        let rendered = format!("{hooks:?}");
        assert!(rendered.contains("on_dev_tools_open: true"));
        assert!(rendered.contains("on_visibility_change: false"));
    }
}
