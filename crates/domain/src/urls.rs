//! URL extraction from free text

use regex::Regex;
use std::sync::LazyLock;

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s]+").expect("Valid regex"));

/// Extract `http(s)://` tokens up to the next whitespace. Order is preserved
/// and duplicates are kept; callers dedupe and truncate.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_in_order_with_duplicates() {
        let text = "see https://a.example/x and http://b.example then https://a.example/x";
        assert_eq!(
            extract_urls(text),
            vec![
                "https://a.example/x",
                "http://b.example",
                "https://a.example/x"
            ]
        );
    }

    #[test]
    fn test_stops_at_whitespace() {
        let text = "iPhone 15 Pro https://www.apple.com/jp/iphone-15-pro/\nspecs";
        assert_eq!(
            extract_urls(text),
            vec!["https://www.apple.com/jp/iphone-15-pro/"]
        );
    }

    #[test]
    fn test_no_urls() {
        assert!(extract_urls("ftp://nope and plain text").is_empty());
    }
}
