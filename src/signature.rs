//! Signature classification of client-declared identification strings.
//!
//! The token list is a closed constant set covering headless browser engines,
//! browser-automation drivers, generic crawler identifiers, and common HTTP
//! client libraries. There is deliberately no runtime extension point.

/// Known automation tokens, matched case-insensitively as substrings.
pub const SIGNATURE_TOKENS: &[&str] = &[
    "headlesschrome",
    "puppeteer",
    "selenium",
    "phantomjs",
    "chromium",
    "webdriver",
    "headless",
    "bot",
    "crawler",
    "spider",
    "scraper",
    "curl",
    "wget",
    "httpclient",
    "python",
    "java/",
    "node",
    "go-http-client",
    "axios",
    "requests",
    "urllib",
    "jsdom",
];

/// Classify a behavioral signal, typically a User-Agent value.
///
/// An absent, empty, or all-whitespace signal is suspicious by default: a
/// client that declares nothing cannot prove legitimacy. Otherwise the signal
/// is lowercased once and scanned against [`SIGNATURE_TOKENS`]; the first
/// match short-circuits.
pub fn is_suspicious_signal(signal: Option<&str>) -> bool {
    let Some(signal) = signal else {
        return true;
    };
    if signal.trim().is_empty() {
        return true;
    }
    let lowered = signal.to_lowercase();
    SIGNATURE_TOKENS.iter().any(|token| lowered.contains(token))
}
