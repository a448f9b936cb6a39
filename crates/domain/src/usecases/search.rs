//! Search use case - picks an engine per call, owns the Brave to DuckDuckGo
//! fallback and the mock-data substitutions

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::{
    mock,
    model::{ResearchJob, ResearchOptions, SearchEngineKind, SearchResult},
    ports::{Clock, ResearchClient, ResearchError, SearchAdapter, SearchError},
    results::{normalize_results, FallbackDomains},
    search_log::SearchLog,
};

/// Body returned by the search endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub logs: Vec<String>,
    pub processing_time_ms: u64,
    /// Engine that actually produced `results`
    pub engine: SearchEngineKind,
    pub requested_engine: SearchEngineKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_mock_data: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_error: Option<bool>,
}

/// Body returned when a deep research job is launched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepResearchLaunch {
    pub job_id: String,
    /// Initial snapshot of the job
    pub data: ResearchJob,
    pub engine: SearchEngineKind,
    pub logs: Vec<String>,
    pub processing_time_ms: u64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_mock_data: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_error: Option<bool>,
}

/// Search orchestrator. Brave, Firecrawl and the research client are absent
/// when their credential is not configured, in which case mock data is served.
pub struct SearchUseCase {
    duckduckgo: Arc<dyn SearchAdapter>,
    brave: Option<Arc<dyn SearchAdapter>>,
    firecrawl: Option<Arc<dyn SearchAdapter>>,
    research: Option<Arc<dyn ResearchClient>>,
    domains: FallbackDomains,
    clock: Arc<dyn Clock>,
}

impl SearchUseCase {
    pub fn new(duckduckgo: Arc<dyn SearchAdapter>, clock: Arc<dyn Clock>) -> Self {
        Self {
            duckduckgo,
            brave: None,
            firecrawl: None,
            research: None,
            domains: FallbackDomains::default(),
            clock,
        }
    }

    pub fn with_brave(mut self, brave: Option<Arc<dyn SearchAdapter>>) -> Self {
        self.brave = brave;
        self
    }

    pub fn with_firecrawl(mut self, firecrawl: Option<Arc<dyn SearchAdapter>>) -> Self {
        self.firecrawl = firecrawl;
        self
    }

    pub fn with_research(mut self, research: Option<Arc<dyn ResearchClient>>) -> Self {
        self.research = research;
        self
    }

    pub fn with_fallback_domains(mut self, domains: FallbackDomains) -> Self {
        self.domains = domains;
        self
    }

    /// Dispatch to the requested engine
    pub async fn search(
        &self,
        engine: SearchEngineKind,
        query: &str,
    ) -> Result<SearchResponse, SearchError> {
        match engine {
            SearchEngineKind::DuckDuckGo => self.search_duckduckgo(query).await,
            SearchEngineKind::Brave => self.search_brave(query).await,
            SearchEngineKind::Firecrawl => self.search_firecrawl(query).await,
        }
    }

    /// DuckDuckGo search. Adapter failures are returned to the caller.
    pub async fn search_duckduckgo(&self, query: &str) -> Result<SearchResponse, SearchError> {
        let query = require_query(query)?;
        let started = Instant::now();
        let mut log = self.log();
        log.record(format!("Search started: \"{}\"", query));

        let results = match self.duckduckgo.search(query, &mut log).await {
            Ok(results) => results,
            Err(e) => {
                log.record(format!("DuckDuckGo search failed: {}", e));
                tracing::error!(engine = "duckduckgo", error = %e, "Search failed");
                return Err(e);
            }
        };

        Ok(self.respond(
            query,
            results,
            log,
            started,
            SearchEngineKind::DuckDuckGo,
            SearchEngineKind::DuckDuckGo,
        ))
    }

    /// Brave search. Never fails for a non-empty query: any Brave failure
    /// falls back to DuckDuckGo, and if that fails too, to mock data.
    pub async fn search_brave(&self, query: &str) -> Result<SearchResponse, SearchError> {
        let query = require_query(query)?;
        let started = Instant::now();
        let mut log = self.log();
        log.record(format!("Brave search started: \"{}\"", query));

        let Some(brave) = &self.brave else {
            log.record("Brave API key is not configured, returning mock data");
            tracing::warn!(engine = "brave", "No API key, serving mock data");
            let mut response = self.respond(
                query,
                mock::brave_results(query),
                log,
                started,
                SearchEngineKind::Brave,
                SearchEngineKind::Brave,
            );
            response.is_mock_data = true;
            return Ok(response);
        };

        let brave_err = match brave.search(query, &mut log).await {
            Ok(results) => {
                return Ok(self.respond(
                    query,
                    results,
                    log,
                    started,
                    SearchEngineKind::Brave,
                    SearchEngineKind::Brave,
                ));
            }
            Err(e) => e,
        };

        let reason = match &brave_err {
            SearchError::RateLimited => "Brave API rate limit exceeded".to_string(),
            other => format!("Brave API error: {}", other),
        };
        log.record(format!("{}, falling back to DuckDuckGo", reason));
        tracing::warn!(engine = "brave", error = %brave_err, "Falling back to DuckDuckGo");

        match self.duckduckgo.search(query, &mut log).await {
            Ok(results) => {
                let mut response = self.respond(
                    query,
                    results,
                    log,
                    started,
                    SearchEngineKind::DuckDuckGo,
                    SearchEngineKind::Brave,
                );
                response.fallback_reason = Some(reason);
                Ok(response)
            }
            Err(ddg_err) => {
                log.record(format!(
                    "DuckDuckGo fallback failed: {}, returning mock data",
                    ddg_err
                ));
                tracing::error!(engine = "duckduckgo", error = %ddg_err, "Fallback search failed");
                let mut response = self.respond(
                    query,
                    mock::brave_results(query),
                    log,
                    started,
                    SearchEngineKind::Brave,
                    SearchEngineKind::Brave,
                );
                response.fallback_reason = Some(reason);
                response.is_mock_data = true;
                response.error = Some(ddg_err.to_string());
                Ok(response)
            }
        }
    }

    /// Firecrawl synchronous search. Failures are replaced by tagged mock data.
    pub async fn search_firecrawl(&self, query: &str) -> Result<SearchResponse, SearchError> {
        let query = require_query(query)?;
        let started = Instant::now();
        let mut log = self.log();
        log.record(format!("Firecrawl search started: \"{}\"", query));

        let outcome = match &self.firecrawl {
            Some(firecrawl) => firecrawl.search(query, &mut log).await.map_err(Some),
            None => Err(None),
        };

        let response = match outcome {
            Ok(results) => self.respond(
                query,
                results,
                log,
                started,
                SearchEngineKind::Firecrawl,
                SearchEngineKind::Firecrawl,
            ),
            Err(err) => {
                match &err {
                    Some(e) => {
                        log.record(format!("Firecrawl search failed: {}, returning mock data", e));
                        tracing::warn!(engine = "firecrawl", error = %e, "Serving mock data");
                    }
                    None => {
                        log.record("Firecrawl API key is not configured, returning mock data");
                        tracing::warn!(engine = "firecrawl", "No API key, serving mock data");
                    }
                }
                let mut response = self.respond(
                    query,
                    mock::firecrawl_results(query),
                    log,
                    started,
                    SearchEngineKind::Firecrawl,
                    SearchEngineKind::Firecrawl,
                );
                response.is_mock_data = true;
                if let Some(e) = err {
                    response.auth_error = Some(matches!(e, SearchError::Auth(_)));
                    response.error = Some(e.to_string());
                }
                response
            }
        };

        Ok(response)
    }

    /// Launch a deep research job and read its initial snapshot. Failures to
    /// launch are replaced by a completed mock job.
    pub async fn deep_research(
        &self,
        query: &str,
        options: &ResearchOptions,
    ) -> Result<DeepResearchLaunch, SearchError> {
        let query = require_query(query)?;
        let started = Instant::now();
        let mut log = self.log();
        log.record(format!(
            "Deep research started: \"{}\" (max depth {}, time limit {}s, max urls {})",
            query, options.max_depth, options.time_limit, options.max_urls
        ));

        let launched = match &self.research {
            Some(client) => client.start(query, options).await.map(|id| (client, id)),
            None => Err(ResearchError::Auth("Firecrawl API key is not configured".into())),
        };

        match launched {
            Ok((client, job_id)) => {
                log.record(format!("Deep research job created: {}", job_id));
                tracing::info!(job_id = %job_id, "Deep research job created");

                let mut data = match client.status(&job_id).await {
                    Ok(job) => job,
                    Err(e) => {
                        log.record(format!("Initial status unavailable: {}", e));
                        ResearchJob::initial(&job_id, options.max_depth)
                    }
                };
                if data.job_id.is_empty() {
                    data.job_id = job_id.clone();
                }
                data.refresh_progress();

                Ok(DeepResearchLaunch {
                    job_id,
                    data,
                    engine: SearchEngineKind::Firecrawl,
                    logs: log.into_lines(),
                    processing_time_ms: started.elapsed().as_millis() as u64,
                    is_mock_data: false,
                    error: None,
                    auth_error: None,
                })
            }
            Err(e) => {
                let configured = self.research.is_some();
                if configured {
                    log.record(format!("Deep research launch failed: {}, returning mock data", e));
                    tracing::warn!(engine = "firecrawl", error = %e, "Serving mock research data");
                } else {
                    log.record("Firecrawl API key is not configured, returning mock data");
                }

                let now = self.clock.now();
                let job_id = mock::mock_job_id(now);
                let data = mock::research_launch(&job_id, query, options, now);

                Ok(DeepResearchLaunch {
                    job_id,
                    data,
                    engine: SearchEngineKind::Firecrawl,
                    logs: log.into_lines(),
                    processing_time_ms: started.elapsed().as_millis() as u64,
                    is_mock_data: true,
                    auth_error: configured.then(|| matches!(e, ResearchError::Auth(_))),
                    error: configured.then(|| e.to_string()),
                })
            }
        }
    }

    fn log(&self) -> SearchLog {
        SearchLog::new(self.clock.clone())
    }

    fn respond(
        &self,
        query: &str,
        results: Vec<SearchResult>,
        mut log: SearchLog,
        started: Instant,
        engine: SearchEngineKind,
        requested_engine: SearchEngineKind,
    ) -> SearchResponse {
        let raw = results.len();
        let results = normalize_results(results, query, &self.domains);
        log.record(format!(
            "Search complete: {} raw results, {} returned",
            raw,
            results.len()
        ));

        let processing_time_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            engine = %engine,
            requested_engine = %requested_engine,
            results = results.len(),
            elapsed_ms = processing_time_ms,
            "Search complete"
        );

        SearchResponse {
            results,
            logs: log.into_lines(),
            processing_time_ms,
            engine,
            requested_engine,
            fallback_reason: None,
            is_mock_data: false,
            error: None,
            auth_error: None,
        }
    }
}

fn require_query(query: &str) -> Result<&str, SearchError> {
    let query = query.trim();
    if query.is_empty() {
        Err(SearchError::MissingQuery)
    } else {
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;
    use crate::results::FALLBACK_SOURCE;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::macros::datetime;

    struct FakeSearch {
        engine: SearchEngineKind,
        outcome: Result<Vec<SearchResult>, SearchError>,
        calls: AtomicUsize,
    }

    impl FakeSearch {
        fn ok(engine: SearchEngineKind, urls: &[&str]) -> Arc<Self> {
            let results = urls
                .iter()
                .map(|u| SearchResult::new(format!("title {u}"), *u, engine.as_str()))
                .collect();
            Arc::new(Self {
                engine,
                outcome: Ok(results),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(engine: SearchEngineKind, err: SearchError) -> Arc<Self> {
            Arc::new(Self {
                engine,
                outcome: Err(err),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SearchAdapter for FakeSearch {
        fn engine(&self) -> SearchEngineKind {
            self.engine
        }

        async fn search(
            &self,
            _query: &str,
            log: &mut SearchLog,
        ) -> Result<Vec<SearchResult>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            log.record(format!("{} called", self.engine));
            self.outcome.clone()
        }
    }

    struct FakeResearch {
        start: Result<String, ResearchError>,
        status: Result<ResearchJob, ResearchError>,
    }

    #[async_trait]
    impl ResearchClient for FakeResearch {
        async fn start(
            &self,
            _query: &str,
            _options: &ResearchOptions,
        ) -> Result<String, ResearchError> {
            self.start.clone()
        }

        async fn status(&self, _job_id: &str) -> Result<ResearchJob, ResearchError> {
            self.status.clone()
        }
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(datetime!(2024-05-01 12:00:00 UTC)))
    }

    fn ddg_urls() -> Vec<&'static str> {
        vec![
            "https://d/1",
            "https://d/2",
            "https://d/3",
            "https://d/4",
            "https://d/5",
            "https://d/6",
        ]
    }

    #[tokio::test]
    async fn test_duckduckgo_results_are_padded() {
        let ddg = FakeSearch::ok(SearchEngineKind::DuckDuckGo, &["https://d/1", "https://d/1", "https://d/2"]);
        let uc = SearchUseCase::new(ddg, clock());

        let response = uc.search(SearchEngineKind::DuckDuckGo, "iPhone").await.unwrap();
        assert_eq!(response.results.len(), 5);
        assert_eq!(
            response.results.iter().filter(|r| r.source == FALLBACK_SOURCE).count(),
            3
        );
        assert!(response.logs.iter().all(|l| l.starts_with("[2024-05-01T12:00:00Z]")));
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let uc = SearchUseCase::new(FakeSearch::ok(SearchEngineKind::DuckDuckGo, &[]), clock());
        for engine in [
            SearchEngineKind::DuckDuckGo,
            SearchEngineKind::Brave,
            SearchEngineKind::Firecrawl,
        ] {
            let err = uc.search(engine, "  ").await.unwrap_err();
            assert_eq!(err, SearchError::MissingQuery);
        }
    }

    #[tokio::test]
    async fn test_brave_rate_limit_falls_back_to_duckduckgo() {
        let ddg = FakeSearch::ok(SearchEngineKind::DuckDuckGo, &ddg_urls());
        let brave = FakeSearch::failing(SearchEngineKind::Brave, SearchError::RateLimited);
        let uc = SearchUseCase::new(ddg.clone(), clock()).with_brave(Some(brave));

        let response = uc.search(SearchEngineKind::Brave, "iPhone").await.unwrap();

        assert_eq!(response.engine, SearchEngineKind::DuckDuckGo);
        assert_eq!(response.requested_engine, SearchEngineKind::Brave);
        assert!(!response.fallback_reason.as_deref().unwrap_or_default().is_empty());
        assert!(!response.is_mock_data);
        assert_eq!(ddg.calls.load(Ordering::SeqCst), 1);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["engine"], "duckduckgo");
    }

    #[tokio::test]
    async fn test_brave_and_duckduckgo_failing_serves_mock() {
        let ddg = FakeSearch::failing(
            SearchEngineKind::DuckDuckGo,
            SearchError::Network("offline".into()),
        );
        let brave = FakeSearch::failing(
            SearchEngineKind::Brave,
            SearchError::Http {
                status: 500,
                body: "boom".into(),
            },
        );
        let uc = SearchUseCase::new(ddg, clock()).with_brave(Some(brave));

        let response = uc.search(SearchEngineKind::Brave, "iPhone").await.unwrap();
        assert!(response.is_mock_data);
        assert!(response.error.is_some());
        assert!(response.fallback_reason.is_some());
        assert_eq!(response.results.len(), 10);
    }

    #[tokio::test]
    async fn test_brave_without_key_serves_mock() {
        let ddg = FakeSearch::ok(SearchEngineKind::DuckDuckGo, &ddg_urls());
        let uc = SearchUseCase::new(ddg.clone(), clock());

        let response = uc.search(SearchEngineKind::Brave, "iPhone").await.unwrap();
        assert!(response.is_mock_data);
        assert_eq!(response.engine, SearchEngineKind::Brave);
        assert_eq!(ddg.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_brave_success_is_not_tagged() {
        let ddg = FakeSearch::ok(SearchEngineKind::DuckDuckGo, &[]);
        let brave = FakeSearch::ok(SearchEngineKind::Brave, &ddg_urls());
        let uc = SearchUseCase::new(ddg, clock()).with_brave(Some(brave));

        let response = uc.search(SearchEngineKind::Brave, "iPhone").await.unwrap();
        assert_eq!(response.engine, SearchEngineKind::Brave);
        assert!(response.fallback_reason.is_none());

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("isMockData").is_none());
        assert!(json.get("fallbackReason").is_none());
    }

    #[tokio::test]
    async fn test_firecrawl_auth_failure_serves_tagged_mock() {
        let ddg = FakeSearch::ok(SearchEngineKind::DuckDuckGo, &[]);
        let firecrawl = FakeSearch::failing(
            SearchEngineKind::Firecrawl,
            SearchError::Auth("Unauthorized: invalid token".into()),
        );
        let uc = SearchUseCase::new(ddg, clock()).with_firecrawl(Some(firecrawl));

        let response = uc.search(SearchEngineKind::Firecrawl, "iPhone").await.unwrap();
        assert!(response.is_mock_data);
        assert_eq!(response.auth_error, Some(true));
        assert!(response.results.iter().all(|r| r.source == "Firecrawl Search"));
    }

    #[tokio::test]
    async fn test_deep_research_reads_initial_snapshot() {
        let ddg = FakeSearch::ok(SearchEngineKind::DuckDuckGo, &[]);
        let research = Arc::new(FakeResearch {
            start: Ok("job-42".into()),
            status: Err(ResearchError::Network("timeout".into())),
        });
        let uc = SearchUseCase::new(ddg, clock()).with_research(Some(research));

        let launch = uc
            .deep_research("iPhone", &ResearchOptions::default())
            .await
            .unwrap();
        assert_eq!(launch.job_id, "job-42");
        assert_eq!(launch.data.current_depth, 0);
        assert_eq!(launch.data.max_depth, 5);
        assert!(!launch.is_mock_data);
    }

    #[tokio::test]
    async fn test_deep_research_without_key_is_mock() {
        let ddg = FakeSearch::ok(SearchEngineKind::DuckDuckGo, &[]);
        let uc = SearchUseCase::new(ddg, clock());

        let launch = uc
            .deep_research("iPhone", &ResearchOptions::default())
            .await
            .unwrap();
        assert!(launch.is_mock_data);
        assert!(launch.job_id.starts_with(mock::MOCK_JOB_PREFIX));
        assert!(launch.data.is_completed());
        assert!(launch.error.is_none());
    }

    #[tokio::test]
    async fn test_deep_research_launch_failure_is_tagged() {
        let ddg = FakeSearch::ok(SearchEngineKind::DuckDuckGo, &[]);
        let research = Arc::new(FakeResearch {
            start: Err(ResearchError::Api("Payment required".into())),
            status: Err(ResearchError::Api("unused".into())),
        });
        let uc = SearchUseCase::new(ddg, clock()).with_research(Some(research));

        let launch = uc
            .deep_research("iPhone", &ResearchOptions::default())
            .await
            .unwrap();
        assert!(launch.is_mock_data);
        assert_eq!(launch.auth_error, Some(false));
        assert!(launch.error.unwrap().contains("Payment required"));
    }
}
