//! Request handlers for API endpoints

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use product_scout_domain::usecases::{AnalysisResponse, AnalyzeError, AnalyzeInput};
use product_scout_domain::{KeyStatus, ResearchError, ResearchOptions, SearchError};
use serde::Deserialize;

use super::SharedState;
use crate::checks::{self, EnvCheck, Service};

// ============================================================================
// Errors
// ============================================================================

/// Error body `{error, details?}` with its HTTP status
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
}

impl ApiError {
    fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
            details: None,
        }
    }

    fn internal(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: error.into(),
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = serde_json::json!({ "error": self.error });
        if let Some(details) = self.details {
            body["details"] = serde_json::Value::String(details);
        }
        (self.status, Json(body)).into_response()
    }
}

impl From<AnalyzeError> for ApiError {
    fn from(e: AnalyzeError) -> Self {
        let status =
            StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let details = match &e {
            AnalyzeError::Provider { source, .. } => {
                Some(e.details().map(str::to_string).unwrap_or_else(|| source.to_string()))
            }
            _ => None,
        };

        Self {
            status,
            error: e.to_string(),
            details,
        }
    }
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::MissingQuery => Self::bad_request(e.to_string()),
            other => Self::internal(format!("Search failed: {}", other)),
        }
    }
}

impl From<ResearchError> for ApiError {
    fn from(e: ResearchError) -> Self {
        match e {
            ResearchError::MissingJobId => Self::bad_request(e.to_string()),
            other => Self::internal(format!("Status read failed: {}", other)),
        }
    }
}

// ============================================================================
// Health
// ============================================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ============================================================================
// Analyze
// ============================================================================

pub async fn analyze(
    State(state): State<SharedState>,
    payload: Result<Json<AnalyzeInput>, JsonRejection>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let Json(input) =
        payload.map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))?;

    let response = state.analyze.analyze(&input).await.map_err(|e| {
        tracing::error!(error = %e, "Analyze request failed");
        ApiError::from(e)
    })?;

    Ok(Json(response))
}

// ============================================================================
// Search
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
}

pub async fn search(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
    let query = params.q.unwrap_or_default();
    let response = state.search.search_duckduckgo(&query).await?;
    Ok(Json(response).into_response())
}

pub async fn search_brave(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
    let query = params.q.unwrap_or_default();
    let response = state.search.search_brave(&query).await?;
    Ok(Json(response).into_response())
}

/// Numeric parameters that fail to parse keep their default
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirecrawlParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub deep_research: Option<String>,
    #[serde(default)]
    pub max_depth: Option<String>,
    #[serde(default)]
    pub time_limit: Option<String>,
    #[serde(default)]
    pub max_urls: Option<String>,
}

fn parse_or(value: Option<&str>, default: u32) -> u32 {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl FirecrawlParams {
    fn deep_research(&self) -> bool {
        self.deep_research.as_deref() == Some("true")
    }

    fn options(&self, defaults: ResearchOptions) -> ResearchOptions {
        ResearchOptions {
            max_depth: parse_or(self.max_depth.as_deref(), defaults.max_depth),
            time_limit: parse_or(self.time_limit.as_deref(), defaults.time_limit),
            max_urls: parse_or(self.max_urls.as_deref(), defaults.max_urls),
        }
    }
}

pub async fn search_firecrawl(
    State(state): State<SharedState>,
    Query(params): Query<FirecrawlParams>,
) -> Result<Response, ApiError> {
    let query = params.q.clone().unwrap_or_default();

    if params.deep_research() {
        let options = params.options(state.research_defaults);
        let launch = state.search.deep_research(&query, &options).await?;
        return Ok(Json(launch).into_response());
    }

    let response = state.search.search_firecrawl(&query).await?;
    Ok(Json(response).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusParams {
    #[serde(default)]
    pub job_id: Option<String>,
}

pub async fn research_status(
    State(state): State<SharedState>,
    Query(params): Query<StatusParams>,
) -> Result<Response, ApiError> {
    let job_id = params.job_id.unwrap_or_default();
    let report = state.research.status(&job_id).await?;
    Ok(Json(report).into_response())
}

// ============================================================================
// Credential probes
// ============================================================================

async fn key_status(state: &SharedState, service: Service) -> Json<KeyStatus> {
    let status = checks::check_key(&state.config, service).await;
    tracing::debug!(
        service = service.as_str(),
        configured = status.configured,
        "Credential checked"
    );
    Json(status)
}

pub async fn check_openai_key(State(state): State<SharedState>) -> Json<KeyStatus> {
    key_status(&state, Service::OpenAi).await
}

pub async fn check_gemini_key(State(state): State<SharedState>) -> Json<KeyStatus> {
    key_status(&state, Service::Gemini).await
}

pub async fn check_claude_key(State(state): State<SharedState>) -> Json<KeyStatus> {
    key_status(&state, Service::Claude).await
}

pub async fn check_brave_key(State(state): State<SharedState>) -> Json<KeyStatus> {
    key_status(&state, Service::Brave).await
}

pub async fn check_firecrawl_key(State(state): State<SharedState>) -> Json<KeyStatus> {
    key_status(&state, Service::Firecrawl).await
}

pub async fn env_check(State(state): State<SharedState>) -> Json<EnvCheck> {
    Json(checks::env_check(&state.config))
}
