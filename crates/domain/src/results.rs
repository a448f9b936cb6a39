//! Normalization of search results: dedupe, cap and fallback padding

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::model::SearchResult;

/// Maximum results returned per response
pub const MAX_RESULTS: usize = 10;

/// Responses with fewer unique results are padded with filler entries
pub const MIN_RESULTS: usize = 5;

/// `source` tag carried by synthetic filler entries
pub const FALLBACK_SOURCE: &str = "Fallback";

/// Rotation of well-known domains used to build filler entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FallbackDomains(Vec<String>);

impl Default for FallbackDomains {
    fn default() -> Self {
        Self(
            [
                "en.wikipedia.org",
                "www.amazon.co.jp",
                "www.rakuten.co.jp",
                "kakaku.com",
                "www.yodobashi.com",
                "www.biccamera.com",
                "www.yamada-denki.jp",
                "www.cnn.co.jp",
                "news.yahoo.co.jp",
                "www.bbc.com",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        )
    }
}

impl FallbackDomains {
    /// Build from a list; an empty list falls back to the default rotation
    pub fn new(domains: Vec<String>) -> Self {
        let domains: Vec<String> = domains
            .into_iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();
        if domains.is_empty() {
            Self::default()
        } else {
            Self(domains)
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Remove repeated URLs, keeping the first occurrence and the original order
pub fn dedupe_by_url(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.url.clone()))
        .collect()
}

/// Dedupe, cap at [`MAX_RESULTS`] and pad up to [`MIN_RESULTS`] with filler
/// entries tagged `source: "Fallback"`
pub fn normalize_results(
    results: Vec<SearchResult>,
    query: &str,
    domains: &FallbackDomains,
) -> Vec<SearchResult> {
    let mut unique = dedupe_by_url(results);
    unique.truncate(MAX_RESULTS);

    if unique.len() < MIN_RESULTS {
        let needed = MIN_RESULTS - unique.len();
        let filler = fallback_entries(query, &unique, needed, domains);
        unique.extend(filler);
    }

    unique
}

/// Deterministic filler entries: the domain rotation is walked in order,
/// skipping URLs already present
pub fn fallback_entries(
    query: &str,
    existing: &[SearchResult],
    needed: usize,
    domains: &FallbackDomains,
) -> Vec<SearchResult> {
    let taken: HashSet<&str> = existing.iter().map(|r| r.url.as_str()).collect();
    let encoded = urlencoding::encode(query);

    domains
        .as_slice()
        .iter()
        .map(|domain| (domain, format!("https://{}/search?q={}", domain, encoded)))
        .filter(|(_, url)| !taken.contains(url.as_str()))
        .take(needed)
        .map(|(domain, url)| {
            SearchResult::new(format!("{} - {}", query, domain), url, FALLBACK_SOURCE)
                .with_description(format!("Search results for {} on {}", query, domain))
        })
        .collect()
}
