//! Request context: tab handles, resource types and origin helpers

use serde::{Deserialize, Serialize};
use url::Url;

/// Opaque handle identifying a page/tab session (the WebContents stand-in).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u64);

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tab-{}", self.0)
    }
}

/// A single subresource request as seen by the interception hook,
/// before the network fetch.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub url: String,
    pub resource_type: crate::rule::ResourceType,
    /// Origin of the document that issued the request.
    pub first_party: String,
    pub is_main_frame: bool,
}

/// Extracts the lowercased host of a URL, or None if it does not parse.
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}

/// Normalizes an origin string to `scheme://host[:port]` form for use as a
/// permission key. Unparseable input is lowercased and trailing-slash
/// trimmed so lookups stay consistent.
pub fn normalize_origin(origin: &str) -> String {
    if let Ok(u) = Url::parse(origin) {
        let ascii = u.origin().ascii_serialization();
        if ascii != "null" {
            return ascii;
        }
    }
    origin.trim_end_matches('/').to_lowercase()
}

/// Extract the registrable domain (simplified, no PSL): the last two
/// labels, or three when the TLD label is two characters (co.uk style).
pub fn base_domain(host: &str) -> &str {
    let parts: Vec<&str> = host.split('.').collect();
    let len = parts.len();
    if len >= 3 && parts[len - 1].len() <= 2 {
        let tail = parts[len - 3..].join(".");
        return &host[host.len() - tail.len()..];
    }
    if len >= 2 {
        let tail = parts[len - 2..].join(".");
        return &host[host.len() - tail.len()..];
    }
    host
}

/// Whether a request host belongs to a different registrable domain than
/// the page host.
pub fn is_third_party(page_host: &str, request_host: &str) -> bool {
    base_domain(page_host) != base_domain(request_host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("https://Sub.Example.com/a?b=1"), Some("sub.example.com".into()));
        assert_eq!(host_of("not a url"), None);
    }

    #[test]
    fn test_normalize_origin() {
        assert_eq!(normalize_origin("http://localhost:8080/"), "http://localhost:8080");
        assert_eq!(normalize_origin("HTTPS://Example.COM"), "https://example.com");
        assert_eq!(normalize_origin("weird-origin/"), "weird-origin");
    }

    #[test]
    fn test_base_domain() {
        assert_eq!(base_domain("cdn.tracker.com"), "tracker.com");
        assert_eq!(base_domain("a.b.example.co.uk"), "example.co.uk");
        assert_eq!(base_domain("localhost"), "localhost");
    }

    #[test]
    fn test_third_party() {
        assert!(is_third_party("example.com", "cdn.other.com"));
        assert!(!is_third_party("example.com", "static.example.com"));
    }
}
