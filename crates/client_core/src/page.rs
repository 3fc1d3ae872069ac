//! Host page introspection helpers.

use url::Url;

/// Browser-internal pages and the extension's own pages cannot be analyzed.
const RESTRICTED_PREFIXES: [&str; 2] = ["chrome://", "chrome-extension://"];

pub fn is_supported_page_url(url: &str) -> bool {
    !url.is_empty()
        && !RESTRICTED_PREFIXES
            .iter()
            .any(|prefix| url.starts_with(prefix))
}

/// Hostname shown next to the status line; the raw URL when it has none.
pub fn display_host(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_internal_and_extension_pages() {
        assert!(!is_supported_page_url(""));
        assert!(!is_supported_page_url("chrome://extensions"));
        assert!(!is_supported_page_url("chrome-extension://abcdef/popup.html"));
        assert!(is_supported_page_url("https://example.com"));
        assert!(is_supported_page_url("file:///tmp/page.html"));
    }

    #[test]
    fn display_host_uses_hostname() {
        assert_eq!(display_host("https://blog.example.com/post/1?x=2"), "blog.example.com");
        assert_eq!(display_host("not a url"), "not a url");
    }
}
