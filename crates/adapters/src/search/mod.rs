//! Web search and crawl adapters

pub mod brave;
pub mod duckduckgo;
pub mod firecrawl;

pub use brave::BraveSearch;
pub use duckduckgo::DuckDuckGoSearch;
pub use firecrawl::FirecrawlClient;

use product_scout_domain::SearchError;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

/// Search calls only get the transport's connect timeout
pub(crate) fn http_client() -> Client {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_default()
}

pub(crate) fn send_error(e: reqwest::Error) -> SearchError {
    SearchError::Network(e.to_string())
}

/// Map a non-success response onto the search error taxonomy
pub(crate) async fn check_status(response: Response) -> Result<Response, SearchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => SearchError::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SearchError::Auth(format!("HTTP {}: {}", status.as_u16(), body))
        }
        _ => SearchError::Http {
            status: status.as_u16(),
            body,
        },
    })
}
