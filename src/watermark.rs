//! Identity watermark overlay.
//!
//! A single fixed, click-through node tiled with a faint identity string so a
//! capture that gets past the blur can still be attributed.

use crate::config::WatermarkStyle;
use crate::platform::{Overlay, Page, PageError};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Well-known id of the watermark node.
pub const WATERMARK_ID: &str = "security-watermark";

/// Class of the watermark node.
pub const WATERMARK_CLASS: &str = "security-watermark";

const DEFAULT_TILES: usize = 6;
const DEFAULT_OPACITY: f64 = 0.08;

const WATERMARK_STYLE: &str = "position:fixed;inset:0;z-index:2147483647;pointer-events:none;\
     user-select:none;overflow:hidden;display:flex;flex-wrap:wrap;\
     align-content:space-around;justify-content:space-around;\
     transform:rotate(-30deg) scale(1.4);font:16px sans-serif;color:#000";

fn overlay(text: &str, tiles: usize, opacity: f64) -> Overlay {
    Overlay {
        id: WATERMARK_ID.to_string(),
        class: WATERMARK_CLASS.to_string(),
        lines: vec![text.to_string(); tiles.max(1)],
        opacity,
        style: WATERMARK_STYLE.to_string(),
    }
}

/// Stamp `text` across the viewport, replacing any existing watermark.
pub fn add_watermark<P: Page>(page: &mut P, text: &str) -> Result<(), PageError> {
    page.upsert_overlay(&overlay(text, DEFAULT_TILES, DEFAULT_OPACITY))
}

/// Remove the watermark. Does nothing if there is none.
pub fn remove_watermark<P: Page>(page: &mut P) -> Result<bool, PageError> {
    page.remove_overlay(WATERMARK_ID)
}

/// The authenticated user the watermark identifies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    #[serde(default)]
    pub id: Option<String>,
}

impl Identity {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Renders watermark text from a template.
#[derive(Debug, Clone)]
pub struct WatermarkTemplate {
    template: String,
    timezone: Option<Tz>,
}

impl WatermarkTemplate {
    pub fn new(style: &WatermarkStyle) -> Self {
        let timezone = style.timezone.as_deref().and_then(|name| match name.parse::<Tz>() {
            Ok(tz) => Some(tz),
            Err(_) => {
                debug!(timezone = name, "unknown watermark timezone, using UTC");
                None
            }
        });
        Self {
            template: style.template.clone(),
            timezone,
        }
    }

    /// Text for `identity` at `at`. Without an identity, `fallback` is used
    /// when non-empty, otherwise a generic stamp.
    pub fn render(&self, identity: Option<&Identity>, fallback: &str, at: DateTime<Utc>) -> String {
        match identity {
            Some(identity) => self
                .template
                .replace("{email}", &identity.email)
                .replace("{id}", identity.id.as_deref().unwrap_or(""))
                .replace("{date}", &self.date_stamp(at)),
            None if !fallback.is_empty() => fallback.to_string(),
            None => format!("Protected Content - {}", at.to_rfc3339()),
        }
    }

    fn date_stamp(&self, at: DateTime<Utc>) -> String {
        match self.timezone {
            Some(tz) => at.with_timezone(&tz).format("%Y-%m-%d %Z").to_string(),
            None => at.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Owner of the watermark node for one activation.
#[derive(Debug)]
pub struct WatermarkOverlay {
    template: WatermarkTemplate,
    tiles: usize,
    opacity: f64,
    mounted: Option<String>,
}

impl WatermarkOverlay {
    pub fn new(style: &WatermarkStyle) -> Self {
        Self {
            template: WatermarkTemplate::new(style),
            tiles: style.tiles,
            opacity: style.opacity,
            mounted: None,
        }
    }

    /// Text of the node currently on the page, if any.
    pub fn mounted(&self) -> Option<&str> {
        self.mounted.as_deref()
    }

    pub fn render(&self, identity: Option<&Identity>, fallback: &str) -> String {
        self.template.render(identity, fallback, Utc::now())
    }

    /// Replace the node with one showing `text`.
    pub fn show<P: Page>(&mut self, page: &mut P, text: String) -> Result<(), PageError> {
        page.upsert_overlay(&overlay(&text, self.tiles, self.opacity))?;
        self.mounted = Some(text);
        Ok(())
    }

    pub fn hide<P: Page>(&mut self, page: &mut P) -> Result<bool, PageError> {
        self.mounted = None;
        remove_watermark(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::HeadlessPage;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 23, 30, 0).unwrap()
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut page = HeadlessPage::new();
        for i in 0..5 {
            add_watermark(&mut page, &format!("user{i}@example.com")).unwrap();
        }
        assert_eq!(page.overlay_count(WATERMARK_ID), 1);

        let node = page.overlay(WATERMARK_ID).unwrap();
        assert_eq!(node.lines.len(), DEFAULT_TILES);
        assert!(node.lines.iter().all(|l| l == "user4@example.com"));
        assert!(node.style.contains("pointer-events:none"));
    }

    #[test]
    fn test_watermark_is_painted_last() {
        let mut page = HeadlessPage::new();
        add_watermark(&mut page, "a").unwrap();
        page.upsert_overlay(&Overlay {
            id: "banner".into(),
            class: String::new(),
            lines: vec![],
            opacity: 1.0,
            style: String::new(),
        })
        .unwrap();
        add_watermark(&mut page, "b").unwrap();
        assert_eq!(page.overlay_order(), vec!["banner", WATERMARK_ID]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut page = HeadlessPage::new();
        assert!(!remove_watermark(&mut page).unwrap());
        add_watermark(&mut page, "x").unwrap();
        assert!(remove_watermark(&mut page).unwrap());
        assert!(!remove_watermark(&mut page).unwrap());
        assert!(page.overlay(WATERMARK_ID).is_none());
    }

    #[test]
    fn test_template_rendering() {
        let template = WatermarkTemplate::new(&WatermarkStyle::default());
        let identity = Identity::new("ada@example.com").with_id("42");
        assert_eq!(
            template.render(Some(&identity), "", at()),
            "ada@example.com - 2026-03-01"
        );

        let style = WatermarkStyle {
            template: "{id}:{email}".into(),
            ..WatermarkStyle::default()
        };
        let template = WatermarkTemplate::new(&style);
        assert_eq!(template.render(Some(&identity), "", at()), "42:ada@example.com");
    }

    #[test]
    fn test_timezone_shifts_date() {
        let style = WatermarkStyle {
            timezone: Some("Asia/Tokyo".into()),
            ..WatermarkStyle::default()
        };
        let template = WatermarkTemplate::new(&style);
        let text = template.render(Some(&Identity::new("a@b.c")), "", at());
        assert!(text.starts_with("a@b.c - 2026-03-02"), "{text}");
    }

    #[test]
    fn test_unknown_timezone_falls_back_to_utc() {
        let style = WatermarkStyle {
            timezone: Some("Mars/Olympus".into()),
            ..WatermarkStyle::default()
        };
        let template = WatermarkTemplate::new(&style);
        assert_eq!(
            template.render(Some(&Identity::new("a@b.c")), "", at()),
            "a@b.c - 2026-03-01"
        );
    }

    #[test]
    fn test_fallback_text() {
        let template = WatermarkTemplate::new(&WatermarkStyle::default());
        assert_eq!(template.render(None, "Internal use only", at()), "Internal use only");
        assert_eq!(
            template.render(None, "", at()),
            "Protected Content - 2026-03-01T23:30:00+00:00"
        );
    }

    #[test]
    fn test_overlay_tracks_mounted_text() {
        let mut page = HeadlessPage::new();
        let mut overlay = WatermarkOverlay::new(&WatermarkStyle::default());
        overlay.show(&mut page, "one".into()).unwrap();
        overlay.show(&mut page, "two".into()).unwrap();
        assert_eq!(overlay.mounted(), Some("two"));
        assert_eq!(page.overlay_count(WATERMARK_ID), 1);

        assert!(overlay.hide(&mut page).unwrap());
        assert_eq!(overlay.mounted(), None);
    }
}
