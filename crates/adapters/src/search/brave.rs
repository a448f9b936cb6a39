//! Brave Search API adapter

use async_trait::async_trait;
use product_scout_domain::{
    KeyStatus, SearchAdapter, SearchEngineKind, SearchError, SearchLog, SearchResult,
};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{check_status, http_client, send_error};

pub const DEFAULT_BASE_URL: &str = "https://api.search.brave.com";

/// Confidence attached to web results, which carry no score of their own
const WEB_CONFIDENCE: f64 = 0.9;

pub struct BraveSearch {
    client: Client,
    api_key: SecretString,
    base_url: String,
}

impl BraveSearch {
    pub fn new(api_key: SecretString) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: SecretString, base_url: String) -> Self {
        Self {
            client: http_client(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn request(&self, query: &str, count: u32) -> Result<reqwest::Response, SearchError> {
        let url = format!("{}/res/v1/web/search", self.base_url);
        let count = count.to_string();
        self.client
            .get(&url)
            .query(&[("q", query), ("count", count.as_str())])
            .header("Accept", "application/json")
            .header("X-Subscription-Token", self.api_key.expose_secret())
            .send()
            .await
            .map_err(send_error)
    }

    /// Live credential probe with a minimal query
    pub async fn probe(&self) -> KeyStatus {
        match self.request("test", 1).await {
            Ok(response) if response.status().is_success() => {
                KeyStatus::configured("Brave Search API key is valid")
            }
            Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => KeyStatus {
                configured: true,
                message: "Brave Search API key is valid but rate limited".to_string(),
                rate_limited: Some(true),
            },
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                KeyStatus::missing(format!(
                    "Brave Search API key was rejected ({}): {}",
                    status, body
                ))
            }
            Err(e) => KeyStatus::missing(format!("Brave Search API is unreachable: {}", e)),
        }
    }
}

#[derive(Deserialize, Default)]
struct BraveResponse {
    #[serde(default)]
    web: Option<Section<WebResult>>,
    #[serde(default)]
    news: Option<Section<NewsResult>>,
}

#[derive(Deserialize)]
struct Section<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Deserialize)]
struct WebResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    age: Option<String>,
    #[serde(default)]
    page_age: Option<String>,
    #[serde(default)]
    family_friendly: Option<bool>,
    #[serde(default)]
    profile: Option<Profile>,
    #[serde(default)]
    meta_url: Option<MetaUrl>,
}

#[derive(Deserialize)]
struct NewsResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    age: Option<String>,
    #[serde(default)]
    page_age: Option<String>,
    #[serde(default)]
    meta_url: Option<MetaUrl>,
}

#[derive(Deserialize)]
struct Profile {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct MetaUrl {
    #[serde(default)]
    favicon: Option<String>,
    #[serde(default)]
    hostname: Option<String>,
}

fn web_result(item: WebResult) -> SearchResult {
    let mut result = SearchResult::new(item.title, item.url, "Brave Search")
        .with_description(item.description)
        .with_confidence(WEB_CONFIDENCE);
    result.age = item.age;
    result.published_time = item.page_age;
    result.is_family = item.family_friendly;
    result.publisher = item.profile.and_then(|p| p.name);
    result.favicon = item.meta_url.and_then(|m| m.favicon);
    result
}

fn news_result(item: NewsResult) -> SearchResult {
    let mut result =
        SearchResult::new(item.title, item.url, "Brave News").with_description(item.description);
    result.age = item.age;
    result.published_time = item.page_age;
    if let Some(meta) = item.meta_url {
        result.favicon = meta.favicon;
        result.publisher = meta.hostname;
    }
    result
}

#[async_trait]
impl SearchAdapter for BraveSearch {
    fn engine(&self) -> SearchEngineKind {
        SearchEngineKind::Brave
    }

    async fn search(
        &self,
        query: &str,
        log: &mut SearchLog,
    ) -> Result<Vec<SearchResult>, SearchError> {
        log.record(format!("Brave Search API request: {}", query));
        let response = self.request(query, 10).await?;
        log.record(format!(
            "Brave Search API status: {}",
            response.status().as_u16()
        ));

        let response = check_status(response).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("application/json") {
            return Err(SearchError::Malformed(format!(
                "Unexpected response content type: {}",
                content_type
            )));
        }

        let body: BraveResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Malformed(e.to_string()))?;

        let web = body.web.map(|s| s.results).unwrap_or_default();
        let news = body.news.map(|s| s.results).unwrap_or_default();
        log.record(format!(
            "Brave returned {} web and {} news results",
            web.len(),
            news.len()
        ));

        Ok(web
            .into_iter()
            .filter(|r| !r.url.is_empty())
            .map(web_result)
            .chain(news.into_iter().filter(|r| !r.url.is_empty()).map(news_result))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use product_scout_domain::SystemClock;
    use std::sync::Arc;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn log() -> SearchLog {
        SearchLog::new(Arc::new(SystemClock))
    }

    fn adapter(server: &MockServer) -> BraveSearch {
        BraveSearch::with_base_url(SecretString::new("brave-key".into()), server.uri())
    }

    #[tokio::test]
    async fn test_web_and_news_results_are_tagged() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/res/v1/web/search"))
            .and(query_param("q", "iPhone 15"))
            .and(query_param("count", "10"))
            .and(header("X-Subscription-Token", "brave-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "web": {"results": [{
                    "title": "iPhone 15 - Apple",
                    "url": "https://www.apple.com/iphone-15/",
                    "description": "Meet iPhone 15",
                    "age": "2 days ago",
                    "family_friendly": true,
                    "profile": {"name": "Apple"},
                    "meta_url": {"favicon": "https://imgs.search.brave.com/apple.png"}
                }]},
                "news": {"results": [{
                    "title": "iPhone 15 review",
                    "url": "https://news.example.com/iphone-15",
                    "meta_url": {"hostname": "news.example.com"}
                }]}
            })))
            .mount(&mock_server)
            .await;

        let results = adapter(&mock_server).search("iPhone 15", &mut log()).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source, "Brave Search");
        assert_eq!(results[0].confidence, Some(0.9));
        assert_eq!(results[0].publisher.as_deref(), Some("Apple"));
        assert_eq!(results[0].is_family, Some(true));
        assert_eq!(results[1].source, "Brave News");
        assert_eq!(results[1].publisher.as_deref(), Some("news.example.com"));
    }

    #[tokio::test]
    async fn test_rate_limit() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/res/v1/web/search"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&mock_server)
            .await;

        let result = adapter(&mock_server).search("iPhone", &mut log()).await;

        assert_eq!(result.unwrap_err(), SearchError::RateLimited);
    }

    #[tokio::test]
    async fn test_non_json_content_is_malformed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/res/v1/web/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html>captcha</html>")
                    .insert_header("content-type", "text/html"),
            )
            .mount(&mock_server)
            .await;

        let result = adapter(&mock_server).search("iPhone", &mut log()).await;

        assert!(matches!(result, Err(SearchError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_probe_reports_rate_limit() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/res/v1/web/search"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let status = adapter(&mock_server).probe().await;

        assert!(status.configured);
        assert_eq!(status.rate_limited, Some(true));
    }

    #[tokio::test]
    async fn test_probe_reports_rejected_key() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/res/v1/web/search"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
            .mount(&mock_server)
            .await;

        let status = adapter(&mock_server).probe().await;

        assert!(!status.configured);
        assert!(status.message.contains("401"));
    }
}
