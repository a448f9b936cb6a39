//! Firecrawl v1 adapter: synchronous search plus deep research jobs

use async_trait::async_trait;
use product_scout_domain::{
    ResearchClient, ResearchError, ResearchJob, ResearchOptions, SearchAdapter, SearchEngineKind,
    SearchError, SearchLog, SearchResult,
};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{check_status, http_client, send_error};

pub const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev/v1";

const SEARCH_LIMIT: u32 = 10;

pub struct FirecrawlClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
}

impl FirecrawlClient {
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

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(self.api_key.expose_secret())
            .header("Content-Type", "application/json")
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(self.api_key.expose_secret())
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    limit: u32,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeepResearchRequest<'a> {
    query: &'a str,
    max_depth: u32,
    time_limit: u32,
    max_urls: u32,
}

#[derive(Deserialize)]
struct DeepResearchStarted {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct StatusEnvelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    job: ResearchJob,
}

#[async_trait]
impl SearchAdapter for FirecrawlClient {
    fn engine(&self) -> SearchEngineKind {
        SearchEngineKind::Firecrawl
    }

    async fn search(
        &self,
        query: &str,
        log: &mut SearchLog,
    ) -> Result<Vec<SearchResult>, SearchError> {
        log.record(format!("Firecrawl search request: {} (limit {})", query, SEARCH_LIMIT));

        let response = self
            .post("/search")
            .json(&SearchRequest {
                query,
                limit: SEARCH_LIMIT,
            })
            .send()
            .await
            .map_err(send_error)?;

        log.record(format!("Firecrawl API status: {}", response.status().as_u16()));
        let response = check_status(response).await?;

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Malformed(e.to_string()))?;

        if body.success == Some(false) {
            return Err(SearchError::Http {
                status: 200,
                body: body.error.unwrap_or_else(|| "Search failed".to_string()),
            });
        }

        log.record(format!("Firecrawl returned {} results", body.data.len()));
        Ok(body
            .data
            .into_iter()
            .filter(|hit| !hit.url.is_empty())
            .map(|hit| {
                let title = hit.title.unwrap_or_else(|| hit.url.clone());
                SearchResult::new(title, hit.url, "Firecrawl")
                    .with_description(hit.description.unwrap_or_default())
            })
            .collect())
    }
}

fn research_send_error(e: reqwest::Error) -> ResearchError {
    ResearchError::Network(e.to_string())
}

async fn research_check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ResearchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ResearchError::Auth(format!("Authentication failed ({}): {}", status.as_u16(), body))
        }
        _ => ResearchError::Api(format!("HTTP {}: {}", status.as_u16(), body)),
    })
}

#[async_trait]
impl ResearchClient for FirecrawlClient {
    async fn start(&self, query: &str, options: &ResearchOptions) -> Result<String, ResearchError> {
        let response = self
            .post("/deep-research")
            .json(&DeepResearchRequest {
                query,
                max_depth: options.max_depth,
                time_limit: options.time_limit,
                max_urls: options.max_urls,
            })
            .send()
            .await
            .map_err(research_send_error)?;

        let response = research_check_status(response).await?;
        let body: DeepResearchStarted = response
            .json()
            .await
            .map_err(|e| ResearchError::Malformed(e.to_string()))?;

        if body.success == Some(false) {
            return Err(ResearchError::Api(
                body.error
                    .unwrap_or_else(|| "Deep research launch failed".to_string()),
            ));
        }

        let id = body
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ResearchError::Malformed("Response has no job id".to_string()))?;
        tracing::info!(job_id = %id, "Deep research job started");
        Ok(id)
    }

    async fn status(&self, job_id: &str) -> Result<ResearchJob, ResearchError> {
        let response = self
            .get(&format!("/deep-research/{}", job_id))
            .send()
            .await
            .map_err(research_send_error)?;

        let response = research_check_status(response).await?;
        let body: StatusEnvelope = response
            .json()
            .await
            .map_err(|e| ResearchError::Malformed(e.to_string()))?;

        if body.success == Some(false) {
            return Err(ResearchError::Api(
                body.error.unwrap_or_else(|| "Status read failed".to_string()),
            ));
        }

        let mut job = body.job;
        if job.job_id.is_empty() {
            job.job_id = job_id.to_string();
        }
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use product_scout_domain::{ResearchStatus, SystemClock};
    use std::sync::Arc;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> FirecrawlClient {
        FirecrawlClient::with_base_url(SecretString::new("fc-key".into()), server.uri())
    }

    #[tokio::test]
    async fn test_search_maps_hits() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("Authorization", "Bearer fc-key"))
            .and(body_json(serde_json::json!({"query": "iPhone", "limit": 10})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": [
                    {"url": "https://www.apple.com/iphone/", "title": "iPhone - Apple", "description": "All models"},
                    {"url": "https://example.com/no-title"},
                    {"title": "missing url"}
                ]
            })))
            .mount(&mock_server)
            .await;

        let mut log = SearchLog::new(Arc::new(SystemClock));
        let results = client(&mock_server).search("iPhone", &mut log).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "iPhone - Apple");
        assert_eq!(results[1].title, "https://example.com/no-title");
        assert!(results.iter().all(|r| r.source == "Firecrawl"));
    }

    #[tokio::test]
    async fn test_search_unauthorized_is_auth_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&mock_server)
            .await;

        let mut log = SearchLog::new(Arc::new(SystemClock));
        let result = client(&mock_server).search("iPhone", &mut log).await;

        assert!(matches!(result, Err(SearchError::Auth(_))));
    }

    #[tokio::test]
    async fn test_start_returns_job_id() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/deep-research"))
            .and(body_json(serde_json::json!({
                "query": "iPhone", "maxDepth": 3, "timeLimit": 120, "maxUrls": 10
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"success": true, "id": "job-123"})),
            )
            .mount(&mock_server)
            .await;

        let options = ResearchOptions {
            max_depth: 3,
            time_limit: 120,
            max_urls: 10,
        };
        let id = client(&mock_server).start("iPhone", &options).await.unwrap();

        assert_eq!(id, "job-123");
    }

    #[tokio::test]
    async fn test_status_parses_snapshot() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/deep-research/job-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "status": "processing",
                "currentDepth": 2,
                "maxDepth": 5,
                "expiresAt": "2024-05-02T12:00:00Z",
                "data": {
                    "activities": [
                        {"type": "search", "status": "complete", "message": "Searching", "timestamp": "2024-05-01T12:00:00Z", "depth": 1}
                    ],
                    "sources": [{"url": "https://a.example", "title": "A"}]
                }
            })))
            .mount(&mock_server)
            .await;

        let job = client(&mock_server).status("job-123").await.unwrap();

        assert_eq!(job.job_id, "job-123");
        assert_eq!(job.status, ResearchStatus::InProgress);
        assert_eq!(job.current_depth, 2);
        assert_eq!(job.data.activities[0].kind, "search");
        assert_eq!(job.data.sources.len(), 1);
    }

    #[tokio::test]
    async fn test_status_failure_flag_is_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/deep-research/gone"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"success": false, "error": "Job expired"})),
            )
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).status("gone").await;

        assert_eq!(result.unwrap_err(), ResearchError::Api("Job expired".into()));
    }
}
