//! Analyze use case - validates a request, dispatches to a provider and turns
//! the raw reply into a product report

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use tokio::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    json_extract::extract_json,
    model::{
        clamp_reference_url_count, AnalysisRequest, MetaInfo, ProductReport, Prompt,
        ProviderFamily, ProviderKind, ProviderReply, UsageInfo, DEFAULT_REFERENCE_URL_COUNT,
    },
    ports::{Clock, LlmProvider, ProviderError},
    pricing::PriceTable,
    prompt::build_prompt,
    urls::extract_urls,
};

/// Key some models wrap the report in
const WRAPPER_KEY: &str = "productInfo";

/// Configuration for the analyze use case
#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    /// Deadline for a single provider call
    pub timeout: Duration,
    /// Provider used when a Claude call fails
    pub fallback_provider: ProviderKind,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            fallback_provider: ProviderKind::OpenAi,
        }
    }
}

/// Providers with a configured credential, keyed by provider id
#[derive(Clone, Default)]
pub struct ProviderSet {
    providers: HashMap<ProviderKind, Arc<dyn LlmProvider>>,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: ProviderKind, provider: Arc<dyn LlmProvider>) -> Self {
        self.providers.insert(kind, provider);
        self
    }

    pub fn get(&self, kind: ProviderKind) -> Option<&Arc<dyn LlmProvider>> {
        self.providers.get(&kind)
    }

    pub fn contains(&self, kind: ProviderKind) -> bool {
        self.providers.contains_key(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Raw analyze request body. Every field is optional so validation can
/// report what is missing instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeInput {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    /// Any JSON number; clamped during validation
    #[serde(default)]
    pub reference_url_count: Option<f64>,
}

/// URLs detected in the query and the subset forwarded to the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlsInfo {
    pub detected: Vec<String>,
    pub used: Vec<String>,
    pub limit: usize,
}

/// Annotation present when a provider other than the requested one answered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackInfo {
    pub from: String,
    pub to: String,
    pub reason: String,
}

/// Report plus the `_`-prefixed diagnostics returned by `/analyze`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    #[serde(flatten)]
    pub report: ProductReport,
    #[serde(rename = "_usage")]
    pub usage: UsageInfo,
    /// Provider that actually answered, after any fallback
    #[serde(rename = "_provider")]
    pub provider: String,
    #[serde(rename = "_urls")]
    pub urls: UrlsInfo,
    #[serde(rename = "_error", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "_fallback", default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackInfo>,
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Configuration(String),
    #[error("{provider} request failed: {source}")]
    Provider {
        provider: ProviderKind,
        #[source]
        source: ProviderError,
    },
}

impl AnalyzeError {
    /// HTTP status for this error. Upstream HTTP failures pass their status
    /// through.
    pub fn status_code(&self) -> u16 {
        match self {
            AnalyzeError::Validation(_) => 400,
            AnalyzeError::Configuration(_) => 500,
            AnalyzeError::Provider {
                source: ProviderError::Http { status, .. },
                ..
            } if *status >= 400 => *status,
            AnalyzeError::Provider { .. } => 500,
        }
    }

    /// Upstream response body, when there is one
    pub fn details(&self) -> Option<&str> {
        match self {
            AnalyzeError::Provider {
                source: ProviderError::Http { body, .. },
                ..
            } => Some(body),
            _ => None,
        }
    }
}

/// Validate a raw request: `query` is required, `provider` must be known
/// (default `openai`), and the URL count is clamped into `[1, 10]`
pub fn validate(input: &AnalyzeInput) -> Result<AnalysisRequest, AnalyzeError> {
    let query = input
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AnalyzeError::Validation("Query is required".to_string()))?;

    let provider = match input.provider.as_deref().map(str::trim) {
        None | Some("") => ProviderKind::OpenAi,
        Some(name) => name.parse().map_err(AnalyzeError::Validation)?,
    };

    let reference_url_count = input
        .reference_url_count
        .map(clamp_reference_url_count)
        .unwrap_or(DEFAULT_REFERENCE_URL_COUNT);

    Ok(AnalysisRequest {
        query: query.to_string(),
        provider,
        reference_url_count,
    })
}

/// Outcome of parsing a provider reply
enum ParsedReport {
    Ok(ProductReport),
    Failed(String),
}

/// Parse raw provider text into a report, unwrapping `productInfo`. An
/// extracted empty object counts as a failure.
fn parse_report(raw: &str) -> ParsedReport {
    let extracted = extract_json(raw);
    let value: Value = match serde_json::from_str(&extracted) {
        Ok(value) => value,
        Err(e) => return ParsedReport::Failed(format!("Failed to parse response: {}", e)),
    };

    let value = match value {
        Value::Object(mut map) => match map.remove(WRAPPER_KEY) {
            Some(inner @ Value::Object(_)) => inner,
            Some(other) => {
                map.insert(WRAPPER_KEY.to_string(), other);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    };

    if value.as_object().is_none_or(|map| map.is_empty()) {
        return ParsedReport::Failed("No JSON object found in provider response".to_string());
    }

    match serde_json::from_value::<ProductReport>(value) {
        Ok(report) => ParsedReport::Ok(report),
        Err(e) => ParsedReport::Failed(format!("Response does not match report schema: {}", e)),
    }
}

/// Analyze orchestrator
pub struct AnalyzeUseCase {
    providers: ProviderSet,
    prices: Arc<PriceTable>,
    clock: Arc<dyn Clock>,
    config: AnalyzeConfig,
}

impl AnalyzeUseCase {
    pub fn new(
        providers: ProviderSet,
        prices: Arc<PriceTable>,
        clock: Arc<dyn Clock>,
        config: AnalyzeConfig,
    ) -> Self {
        Self {
            providers,
            prices,
            clock,
            config,
        }
    }

    /// Validate, dispatch and parse. Parse failures degrade to a placeholder
    /// report with `_error`; only validation, configuration and provider
    /// failures are returned as errors.
    pub async fn analyze(&self, input: &AnalyzeInput) -> Result<AnalysisResponse, AnalyzeError> {
        let request = validate(input)?;
        let span = tracing::info_span!(
            "analyze",
            request_id = %Uuid::new_v4(),
            provider = %request.provider,
        );
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: AnalysisRequest) -> Result<AnalysisResponse, AnalyzeError> {
        let started = Instant::now();

        let mut detected = Vec::new();
        for url in extract_urls(&request.query) {
            if !detected.contains(&url) {
                detected.push(url);
            }
        }
        let used: Vec<String> = detected
            .iter()
            .take(request.reference_url_count)
            .cloned()
            .collect();

        let prompt = build_prompt(&request.query, &used, request.reference_url_count);

        tracing::info!(
            detected_urls = detected.len(),
            used_urls = used.len(),
            "Dispatching analysis"
        );

        let (answered_by, reply, fallback) = self.dispatch(request.provider, &prompt).await?;

        let (mut report, error) = match parse_report(&reply.content) {
            ParsedReport::Ok(report) => (report, None),
            ParsedReport::Failed(reason) => {
                tracing::warn!(provider = %answered_by, %reason, "Returning placeholder report");
                (ProductReport::placeholder(), Some(reason))
            }
        };

        if report.meta_info.is_none() {
            report.meta_info = Some(MetaInfo {
                extraction_date: self.clock.now().format(&Rfc3339).unwrap_or_default(),
                source_urls: used.clone(),
            });
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let cost = self.prices.estimate(
            answered_by.as_str(),
            reply.usage.prompt_tokens,
            reply.usage.completion_tokens,
        );
        let usage = UsageInfo {
            prompt_tokens: reply.usage.prompt_tokens,
            completion_tokens: reply.usage.completion_tokens,
            total_tokens: reply.usage.total(),
            input_cost: cost.input_cost,
            output_cost: cost.output_cost,
            total_cost: cost.total_cost,
            model: reply.model,
            processing_time_ms: elapsed_ms,
        };

        tracing::info!(
            provider = %answered_by,
            total_tokens = usage.total_tokens,
            elapsed_ms,
            degraded = error.is_some(),
            "Analysis complete"
        );

        Ok(AnalysisResponse {
            report,
            usage,
            provider: answered_by.as_str().to_string(),
            urls: UrlsInfo {
                detected,
                used,
                limit: request.reference_url_count,
            },
            error,
            fallback,
        })
    }

    /// Call the requested provider. A failing Claude call is retried once
    /// against the fallback provider when one is configured.
    async fn dispatch(
        &self,
        kind: ProviderKind,
        prompt: &Prompt,
    ) -> Result<(ProviderKind, ProviderReply, Option<FallbackInfo>), AnalyzeError> {
        let primary = self.providers.get(kind).ok_or_else(|| {
            AnalyzeError::Configuration(format!("API key for {} is not configured", kind))
        })?;

        let err = match self.call(primary.as_ref(), prompt).await {
            Ok(reply) => return Ok((kind, reply, None)),
            Err(err) => err,
        };

        let fallback_kind = self.config.fallback_provider;
        let fallback = match self.providers.get(fallback_kind) {
            Some(fallback) if kind.family() == ProviderFamily::Claude && fallback_kind != kind => {
                fallback
            }
            _ => {
                tracing::error!(provider = %kind, error = %err, "Provider call failed");
                return Err(AnalyzeError::Provider {
                    provider: kind,
                    source: err,
                });
            }
        };

        tracing::warn!(
            from = %kind,
            to = %fallback_kind,
            error = %err,
            "Provider call failed, falling back"
        );

        match self.call(fallback.as_ref(), prompt).await {
            Ok(reply) => Ok((
                fallback_kind,
                reply,
                Some(FallbackInfo {
                    from: kind.as_str().to_string(),
                    to: fallback_kind.as_str().to_string(),
                    reason: err.to_string(),
                }),
            )),
            Err(fallback_err) => {
                tracing::error!(provider = %fallback_kind, error = %fallback_err, "Fallback provider failed");
                Err(AnalyzeError::Provider {
                    provider: fallback_kind,
                    source: fallback_err,
                })
            }
        }
    }

    async fn call(
        &self,
        provider: &dyn LlmProvider,
        prompt: &Prompt,
    ) -> Result<ProviderReply, ProviderError> {
        tracing::debug!(adapter = provider.name(), "Calling provider");
        tokio::time::timeout(self.config.timeout, provider.complete(prompt))
            .await
            .map_err(|_| ProviderError::Timeout)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TokenUsage, NOT_AVAILABLE};
    use crate::ports::FixedClock;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use time::macros::datetime;

    const REPORT: &str = r#"{
        "productInfo": {
            "basic": {"fullName": "iPhone 15 Pro", "manufacturer": "Apple", "category": "Smartphone",
                      "price": {"current": "159,800", "original": "159,800"}, "releaseDate": "2023-09-22"},
            "goodPoints": [
                {"point": "Titanium", "description": "Light and strong"},
                {"point": "A17 Pro", "description": "Fast"},
                {"point": "USB-C", "description": "Universal port"}
            ],
            "badPoints": [
                {"point": "Price", "description": "Expensive"},
                {"point": "Heat", "description": "Runs warm"},
                {"point": "Battery", "description": "Average"}
            ],
            "specifications": {"weight": "187g", "materials": ["titanium", "glass"]}
        }
    }"#;

    struct FakeProvider {
        content: String,
        model: &'static str,
        calls: AtomicUsize,
        prompts: Mutex<Vec<Prompt>>,
    }

    impl FakeProvider {
        fn new(content: &str, model: &'static str) -> Self {
            Self {
                content: content.to_string(),
                model,
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn complete(&self, prompt: &Prompt) -> Result<ProviderReply, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.clone());
            Ok(ProviderReply {
                content: self.content.clone(),
                usage: TokenUsage::new(1200, 800),
                model: self.model.to_string(),
            })
        }
    }

    struct FailingProvider(ProviderError);

    #[async_trait]
    impl LlmProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn complete(&self, _prompt: &Prompt) -> Result<ProviderReply, ProviderError> {
            Err(self.0.clone())
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl LlmProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn complete(&self, _prompt: &Prompt) -> Result<ProviderReply, ProviderError> {
            tokio::time::sleep(Duration::from_secs(300)).await;
            Err(ProviderError::Network("unreachable".into()))
        }
    }

    fn use_case(providers: ProviderSet) -> AnalyzeUseCase {
        AnalyzeUseCase::new(
            providers,
            Arc::new(PriceTable::default()),
            Arc::new(FixedClock(datetime!(2024-05-01 12:00:00 UTC))),
            AnalyzeConfig::default(),
        )
    }

    fn input(query: &str, provider: &str) -> AnalyzeInput {
        AnalyzeInput {
            query: Some(query.to_string()),
            provider: Some(provider.to_string()),
            reference_url_count: Some(3.0),
        }
    }

    #[test]
    fn test_validate_defaults_and_clamps() {
        let request = validate(&AnalyzeInput {
            query: Some("  Pixel 8 ".into()),
            provider: None,
            reference_url_count: Some(15.0),
        })
        .unwrap();
        assert_eq!(request.query, "Pixel 8");
        assert_eq!(request.provider, ProviderKind::OpenAi);
        assert_eq!(request.reference_url_count, 10);

        let request = validate(&AnalyzeInput {
            query: Some("Pixel 8".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(request.reference_url_count, DEFAULT_REFERENCE_URL_COUNT);
    }

    #[test]
    fn test_validate_clamps_any_json_number() {
        let cases = [
            (r#"{"query":"Pixel 8","referenceUrlCount":99999999999999999999}"#, 10),
            (r#"{"query":"Pixel 8","referenceUrlCount":5.0}"#, 5),
            (r#"{"query":"Pixel 8","referenceUrlCount":1e3}"#, 10),
            (r#"{"query":"Pixel 8","referenceUrlCount":-2.5}"#, 1),
        ];

        for (body, expected) in cases {
            let input: AnalyzeInput = serde_json::from_str(body).unwrap();
            let request = validate(&input).unwrap();
            assert_eq!(request.reference_url_count, expected, "body: {}", body);
        }
    }

    #[test]
    fn test_validate_rejects_unknown_provider() {
        let err = validate(&input("Pixel 8", "gpt-9")).unwrap_err();
        assert!(matches!(err, AnalyzeError::Validation(_)));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_end_to_end_openai_report() {
        let openai = Arc::new(FakeProvider::new(REPORT, "gpt-4o"));
        let uc = use_case(ProviderSet::new().with(ProviderKind::OpenAi, openai.clone()));

        let response = uc.analyze(&input("iPhone 15 Pro", "openai")).await.unwrap();

        assert_eq!(response.report.good_points.len(), 3);
        assert_eq!(response.report.bad_points.len(), 3);
        assert_eq!(
            response.usage.total_tokens,
            response.usage.prompt_tokens + response.usage.completion_tokens
        );
        assert_eq!(response.provider, "openai");
        assert!(response.error.is_none());
        assert!(response.fallback.is_none());
        assert!((response.usage.total_cost - (1.2 * 0.01 + 0.8 * 0.03)).abs() < 1e-9);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["goodPoints"].as_array().unwrap().len(), 3);
        assert_eq!(json["_provider"], "openai");
        assert_eq!(json["_usage"]["totalTokens"], 2000);
        assert_eq!(json["metaInfo"]["extractionDate"], "2024-05-01T12:00:00Z");
    }

    #[tokio::test]
    async fn test_missing_query_makes_no_provider_call() {
        let openai = Arc::new(FakeProvider::new(REPORT, "gpt-4o"));
        let uc = use_case(ProviderSet::new().with(ProviderKind::OpenAi, openai.clone()));

        let err = uc.analyze(&input("   ", "openai")).await.unwrap_err();
        assert!(matches!(err, AnalyzeError::Validation(_)));
        assert_eq!(openai.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reference_urls_are_truncated_and_forwarded() {
        let openai = Arc::new(FakeProvider::new(REPORT, "gpt-4o"));
        let uc = use_case(ProviderSet::new().with(ProviderKind::OpenAi, openai.clone()));

        let response = uc
            .analyze(&AnalyzeInput {
                query: Some("compare https://a.example https://b.example https://a.example".into()),
                provider: Some("openai".into()),
                reference_url_count: Some(1.0),
            })
            .await
            .unwrap();

        assert_eq!(response.urls.detected, vec!["https://a.example", "https://b.example"]);
        assert_eq!(response.urls.used, vec!["https://a.example"]);
        assert_eq!(response.urls.limit, 1);

        let prompts = openai.prompts.lock().unwrap();
        assert!(prompts[0].user.ends_with("Reference URLs:\nhttps://a.example"));
    }

    #[tokio::test]
    async fn test_unparseable_output_degrades_to_placeholder() {
        let openai = Arc::new(FakeProvider::new("Sorry, I cannot help with that.", "gpt-4o"));
        let uc = use_case(ProviderSet::new().with(ProviderKind::OpenAi, openai));

        let response = uc.analyze(&input("iPhone 15 Pro", "openai")).await.unwrap();

        assert!(response.error.is_some());
        assert_eq!(response.report.good_points[0].point, NOT_AVAILABLE);
        assert_eq!(response.provider, "openai");
    }

    #[tokio::test]
    async fn test_empty_object_is_a_parse_failure() {
        let openai = Arc::new(FakeProvider::new("```json\n{}\n```", "gpt-4o"));
        let uc = use_case(ProviderSet::new().with(ProviderKind::OpenAi, openai));

        let response = uc.analyze(&input("iPhone 15 Pro", "openai")).await.unwrap();
        assert!(response.error.is_some());
    }

    #[tokio::test]
    async fn test_claude_failure_falls_back_to_openai() {
        let openai = Arc::new(FakeProvider::new(REPORT, "gpt-4o"));
        let claude = Arc::new(FailingProvider(ProviderError::Http {
            status: 401,
            body: "invalid x-api-key".into(),
        }));
        let uc = use_case(
            ProviderSet::new()
                .with(ProviderKind::OpenAi, openai.clone())
                .with(ProviderKind::ClaudeSonnet, claude),
        );

        let response = uc.analyze(&input("iPhone 15 Pro", "claude-sonnet")).await.unwrap();

        assert_eq!(response.provider, "openai");
        let fallback = response.fallback.unwrap();
        assert_eq!(fallback.from, "claude-sonnet");
        assert_eq!(fallback.to, "openai");
        assert!(fallback.reason.contains("401"));
        assert_eq!(openai.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_claude_config_failure_also_falls_back() {
        let openai = Arc::new(FakeProvider::new(REPORT, "gpt-4o"));
        let claude = Arc::new(FailingProvider(ProviderError::Config(
            "model not enabled".into(),
        )));
        let uc = use_case(
            ProviderSet::new()
                .with(ProviderKind::OpenAi, openai.clone())
                .with(ProviderKind::ClaudeHaiku, claude),
        );

        let response = uc.analyze(&input("iPhone 15 Pro", "claude-haiku")).await.unwrap();

        assert_eq!(response.provider, "openai");
        assert_eq!(response.fallback.unwrap().from, "claude-haiku");
        assert_eq!(openai.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_claude_failure_without_fallback_surfaces_claude_error() {
        let claude = Arc::new(FailingProvider(ProviderError::Malformed("no content".into())));
        let uc = use_case(ProviderSet::new().with(ProviderKind::ClaudeHaiku, claude));

        let err = uc.analyze(&input("iPhone 15 Pro", "claude-haiku")).await.unwrap_err();
        assert!(matches!(
            err,
            AnalyzeError::Provider {
                provider: ProviderKind::ClaudeHaiku,
                ..
            }
        ));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_non_claude_failure_passes_status_through() {
        let openai = Arc::new(FakeProvider::new(REPORT, "gpt-4o"));
        let gemini = Arc::new(FailingProvider(ProviderError::Http {
            status: 429,
            body: "quota".into(),
        }));
        let uc = use_case(
            ProviderSet::new()
                .with(ProviderKind::OpenAi, openai.clone())
                .with(ProviderKind::Gemini, gemini),
        );

        let err = uc.analyze(&input("iPhone 15 Pro", "gemini")).await.unwrap_err();
        assert_eq!(err.status_code(), 429);
        assert_eq!(err.details(), Some("quota"));
        assert_eq!(openai.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_credential_is_configuration_error() {
        let uc = use_case(ProviderSet::new());
        let err = uc.analyze(&input("iPhone 15 Pro", "gemini-light")).await.unwrap_err();
        assert!(matches!(err, AnalyzeError::Configuration(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_timeout_is_provider_failure() {
        let uc = use_case(ProviderSet::new().with(ProviderKind::Gpt35, Arc::new(SlowProvider)));

        let err = uc.analyze(&input("iPhone 15 Pro", "gpt35")).await.unwrap_err();
        assert!(matches!(
            err,
            AnalyzeError::Provider {
                source: ProviderError::Timeout,
                ..
            }
        ));
    }
}
