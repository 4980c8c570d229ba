//! Environment probes: fullscreen, focus, visibility and pixel ratio.
//!
//! Unsupported APIs read as the value that keeps protection possible:
//! fullscreen is never assumed, focus is assumed present, the document is
//! assumed visible.

use crate::platform::Page;

/// Cross-vendor fullscreen query. `false` when the API is missing, so
/// fullscreen suppression can never be switched on by an absent API.
pub fn is_fullscreen_active<P: Page>(page: &P) -> bool {
    page.fullscreen_active().unwrap_or(false)
}

/// `document.hasFocus()`, `true` when unavailable.
pub fn has_focus<P: Page>(page: &P) -> bool {
    page.has_focus().unwrap_or(true)
}

/// `document.hidden`, `false` when unavailable.
pub fn is_hidden<P: Page>(page: &P) -> bool {
    page.document_hidden().unwrap_or(false)
}

/// Current `devicePixelRatio`, if the page exposes one.
pub fn pixel_ratio<P: Page>(page: &P) -> Option<f64> {
    page.device_pixel_ratio().filter(|ratio| ratio.is_finite() && *ratio > 0.0)
}

/// A ratio change large enough not to be float noise.
pub fn pixel_ratio_changed(previous: f64, current: f64) -> bool {
    (previous - current).abs() > f64::EPSILON * 16.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::HeadlessPage;

    #[test]
    fn test_missing_fullscreen_api_reads_false() {
        let mut page = HeadlessPage::without_fullscreen_api();
        page.set_fullscreen(true);
        assert!(!is_fullscreen_active(&page));
    }

    #[test]
    fn test_hidden_page_has_no_focus() {
        let mut page = HeadlessPage::new();
        assert!(has_focus(&page));
        page.set_hidden(true);
        assert!(is_hidden(&page));
        assert!(!has_focus(&page));
    }

    #[test]
    fn test_pixel_ratio_filtering() {
        let mut page = HeadlessPage::new();
        page.set_pixel_ratio(2.0);
        assert_eq!(pixel_ratio(&page), Some(2.0));
        page.set_pixel_ratio(f64::NAN);
        assert_eq!(pixel_ratio(&page), None);

        assert!(!pixel_ratio_changed(1.0, 1.0));
        assert!(pixel_ratio_changed(1.0, 1.25));
    }
}
