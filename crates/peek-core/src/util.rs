//! Small id/url normalization helpers.

use once_cell::sync::Lazy;
use regex::Regex;

static VERSION_MID: Lazy<Regex> = Lazy::new(|| Regex::new(r"&v=\w+").expect("static regex"));
static VERSION_FIRST: Lazy<Regex> = Lazy::new(|| Regex::new(r"\?v=\w+").expect("static regex"));
static TIMESTAMP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bt=\d{13}&?\b").expect("static regex"));
static TRAILING_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[?&]$").expect("static regex"));

/// Strip a `v=<hash>` cache-busting fragment from a module id.
///
/// `/src/a.js?v=abc` and `/src/a.js?foo&v=abc` both normalize to their
/// version-less form; ids without a `v=` fragment pass through unchanged.
pub fn remove_version_query(id: &str) -> String {
    if !id.contains("v=") {
        return id.to_string();
    }
    let id = VERSION_MID.replace(id, "");
    let id = VERSION_FIRST.replace(&id, "?");
    TRAILING_SEPARATOR.replace(&id, "").into_owned()
}

/// Strip a hot-reload `t=<timestamp>` fragment from a request url.
///
/// Used to key server-timing metrics so repeated hot reloads of one url
/// aggregate under a single entry.
pub fn remove_timestamp_query(url: &str) -> String {
    let url = TIMESTAMP.replace(url, "");
    TRAILING_SEPARATOR.replace(&url, "").into_owned()
}
