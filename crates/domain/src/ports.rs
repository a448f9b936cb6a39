//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{
    Prompt, ProviderReply, ResearchJob, ResearchOptions, SearchEngineKind, SearchResult,
};
use crate::search_log::SearchLog;

/// Failure of a single provider call. Adapters return one of these variants
/// instead of panicking on unexpected response shapes.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Malformed provider response: {0}")]
    Malformed(String),
    #[error("Provider call timed out")]
    Timeout,
    #[error("Network error: {0}")]
    Network(String),
}

/// Port for LLM providers that turn a prompt pair into raw text
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short tag identifying the adapter in logs
    fn name(&self) -> &str;

    /// Send the prompt and return the first content item plus usage
    async fn complete(&self, prompt: &Prompt) -> Result<ProviderReply, ProviderError>;
}

/// Error type for search adapters
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SearchError {
    #[error("Search query is required")]
    MissingQuery,
    #[error("Rate limited (HTTP 429)")]
    RateLimited,
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Search API returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Malformed search response: {0}")]
    Malformed(String),
}

/// Port for web search engines
#[async_trait]
pub trait SearchAdapter: Send + Sync {
    fn engine(&self) -> SearchEngineKind;

    /// Run a query, recording progress into the request-scoped log
    async fn search(
        &self,
        query: &str,
        log: &mut SearchLog,
    ) -> Result<Vec<SearchResult>, SearchError>;
}

/// Error type for deep research operations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResearchError {
    #[error("Job ID is required")]
    MissingJobId,
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Research API error: {0}")]
    Api(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Malformed research response: {0}")]
    Malformed(String),
}

/// Port for the asynchronous crawl service running deep research jobs
#[async_trait]
pub trait ResearchClient: Send + Sync {
    /// Create a job and return its identifier immediately
    async fn start(&self, query: &str, options: &ResearchOptions) -> Result<String, ResearchError>;

    /// Read a snapshot of the job. Has no side effects on the job.
    async fn status(&self, job_id: &str) -> Result<ResearchJob, ResearchError>;
}

/// Port the deep research poller reads job snapshots from
#[async_trait]
pub trait ResearchStatusSource: Send + Sync {
    async fn read_status(&self, job_id: &str) -> Result<ResearchJob, ResearchError>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}
