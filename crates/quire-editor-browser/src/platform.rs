//! Browser detection, folded into a [`Quirks`] table once per page.

use std::sync::OnceLock;

use quire_editor_core::Quirks;

/// Browser facts read from the user agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserAgent {
    pub apple: bool,
    pub firefox: bool,
    pub safari: bool,
    /// EdgeHTML before the Chromium switch.
    pub edge_legacy: bool,
    /// Chrome before 76.
    pub chrome_legacy: bool,
}

impl UserAgent {
    pub fn parse(user_agent: &str, platform: &str) -> Self {
        let ua = user_agent.to_lowercase();
        let platform = platform.to_lowercase();
        let apple = platform.contains("mac")
            || ["mac os x", "iphone", "ipad", "ipod"]
                .iter()
                .any(|needle| ua.contains(needle));
        let firefox = ua.contains("firefox") && !ua.contains("seamonkey");
        let safari = ua.contains("version/") && ua.contains("safari") && !ua.contains("chrome");
        let edge_legacy = extract_version(&ua, "edge/").is_some_and(|v| v < 79);
        let chrome_legacy = extract_version(&ua, "chrome/").is_some_and(|v| v < 76);
        Self {
            apple,
            firefox,
            safari,
            edge_legacy,
            chrome_legacy,
        }
    }

    pub fn quirks(&self, has_caret_position_from_point: bool) -> Quirks {
        Quirks {
            has_before_input_support: !(self.firefox || self.edge_legacy || self.chrome_legacy),
            is_apple: self.apple,
            composition_end_inserts_text: !self.safari && !self.firefox,
            refocus_after_selection: self.firefox,
            redirect_nested_focus: self.firefox,
            drop_needs_manual_insert: !self.safari,
            has_caret_position_from_point,
        }
    }
}

fn extract_version(ua: &str, prefix: &str) -> Option<u32> {
    ua.find(prefix).and_then(|idx| {
        let after = &ua[idx + prefix.len()..];
        let digits: String = after.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    })
}

static QUIRKS: OnceLock<Quirks> = OnceLock::new();

/// Cached quirks. Detection runs once on first call.
pub fn quirks() -> Quirks {
    *QUIRKS.get_or_init(detect_quirks)
}

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub fn detect_quirks() -> Quirks {
    use js_sys::Reflect;
    use wasm_bindgen::JsValue;

    let Some(window) = web_sys::window() else {
        return Quirks::default();
    };
    let navigator = window.navigator();
    let user_agent = navigator.user_agent().unwrap_or_default();
    let platform = navigator.platform().unwrap_or_default();

    let has_caret = window.document().is_some_and(|document| {
        ["caretPositionFromPoint", "caretRangeFromPoint"]
            .iter()
            .any(|name| Reflect::has(&document, &JsValue::from_str(name)).unwrap_or(false))
    });

    let quirks = UserAgent::parse(&user_agent, &platform).quirks(has_caret);
    tracing::debug!(target: "quire::events", ?quirks, "detected browser quirks");
    quirks
}

#[cfg(not(all(target_arch = "wasm32", target_os = "unknown")))]
pub fn detect_quirks() -> Quirks {
    Quirks::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const SAFARI_IOS: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
    const FIREFOX_LINUX: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";
    const CHROME_OLD: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/70.0.3538.102 Safari/537.36";
    const EDGE_LEGACY: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/70.0.3538.102 Safari/537.36 Edge/18.19582";

    #[test]
    fn test_modern_chrome_is_the_baseline() {
        let quirks = UserAgent::parse(CHROME_MAC, "MacIntel").quirks(true);
        assert_eq!(
            quirks,
            Quirks {
                is_apple: true,
                ..Quirks::default()
            }
        );
    }

    #[test]
    fn test_safari_inserts_drops_natively() {
        let ua = UserAgent::parse(SAFARI_IOS, "iPhone");
        assert!(ua.safari && ua.apple);
        let quirks = ua.quirks(true);
        assert!(quirks.has_before_input_support);
        assert!(!quirks.drop_needs_manual_insert);
        assert!(!quirks.composition_end_inserts_text);
    }

    #[test]
    fn test_firefox_flags() {
        let quirks = UserAgent::parse(FIREFOX_LINUX, "Linux x86_64").quirks(true);
        assert!(!quirks.has_before_input_support);
        assert!(quirks.refocus_after_selection);
        assert!(quirks.redirect_nested_focus);
        assert!(!quirks.is_apple);
    }

    #[test]
    fn test_legacy_engines_lack_before_input() {
        let chrome = UserAgent::parse(CHROME_OLD, "Win32");
        assert!(chrome.chrome_legacy && !chrome.edge_legacy);
        assert!(!chrome.quirks(true).has_before_input_support);

        let edge = UserAgent::parse(EDGE_LEGACY, "Win32");
        assert!(edge.edge_legacy);
        assert!(!edge.quirks(false).has_before_input_support);
    }

    #[test]
    fn test_non_wasm_detection_defaults() {
        assert_eq!(quirks(), Quirks::default());
    }
}
