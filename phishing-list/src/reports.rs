/*!
Report-count extraction from abuse-report pages.

The lookup service only offers HTML, so the count is scraped with an ordered
list of patterns. Everything leaving this module is already normalized into a
[`LookupResult`].
*/

use once_cell::sync::Lazy;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Outcome of one corroboration lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResult {
    pub identifier: String,
    pub report_count: u64,
    pub found: bool,
}

impl LookupResult {
    pub fn found(identifier: impl Into<String>, report_count: u64) -> Self {
        Self {
            identifier: identifier.into(),
            report_count,
            found: true,
        }
    }

    /// Result used for every failure: no page, no count
    pub fn not_found(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            report_count: 0,
            found: false,
        }
    }
}

/// Everything except what a URI component may carry unescaped
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

// Counts are ASCII digits only
static REPORT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)([0-9]+)\s+Scam\s+Reports?",
        r"(?i)Reports\s+submitted\s+for[^>]*>([^<]*)<",
        r"(?i)([0-9]+)\s+reports?\s+found",
        r"(?i)Total\s+reports?:\s*([0-9]+)",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Scrapes a report count out of a lookup page
#[derive(Debug, Clone)]
pub struct ReportExtractor {
    site_marker: String,
}

impl Default for ReportExtractor {
    fn default() -> Self {
        Self::new("chainabuse")
    }
}

impl ReportExtractor {
    /// `site_marker` is the text that proves the body came from the lookup site
    /// rather than an error or interstitial page.
    pub fn new(site_marker: impl Into<String>) -> Self {
        Self {
            site_marker: site_marker.into(),
        }
    }

    pub fn extract(&self, identifier: &str, html: &str) -> LookupResult {
        for pattern in REPORT_PATTERNS.iter() {
            let Some(captures) = pattern.captures(html) else {
                continue;
            };
            if let Some(count) = captures.get(1).and_then(|m| leading_integer(m.as_str())) {
                return LookupResult::found(identifier, count);
            }
        }

        let bare = strip_scheme(identifier);
        if html.contains(self.site_marker.as_str()) && html.contains(bare) {
            return LookupResult::found(identifier, 0);
        }

        LookupResult::not_found(identifier)
    }
}

/// Leading decimal digits after optional whitespace, e.g. `" 12 reports"` -> 12
fn leading_integer(text: &str) -> Option<u64> {
    let trimmed = text.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}

/// Drop a leading `http://` or `https://`
pub fn strip_scheme(identifier: &str) -> &str {
    identifier
        .strip_prefix("https://")
        .or_else(|| identifier.strip_prefix("http://"))
        .unwrap_or(identifier)
}

/// Per-identifier lookup URL: `base` followed by the URL-encoded full address.
///
/// Identifiers without a scheme are treated as `https://` addresses.
pub fn lookup_url(base: &str, identifier: &str) -> String {
    let full = if identifier.starts_with("http") {
        identifier.to_string()
    } else {
        format!("https://{}", identifier)
    };
    let encoded = utf8_percent_encode(&full, COMPONENT);
    format!("{}/{}", base.trim_end_matches('/'), encoded)
}
