//! Domain models and value objects

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Sentinel written into placeholder reports when a field could not be produced
pub const NOT_AVAILABLE: &str = "情報なし";

/// Sentinel description used alongside [`NOT_AVAILABLE`]
pub const NOT_FOUND: &str = "not found";

/// Default number of reference URLs forwarded to the provider
pub const DEFAULT_REFERENCE_URL_COUNT: usize = 3;

/// Bounds for the reference URL count
pub const MIN_REFERENCE_URLS: usize = 1;
pub const MAX_REFERENCE_URLS: usize = 10;

/// Clamp a requested reference URL count into `[1, 10]`. Any JSON number is
/// accepted; fractions are truncated after clamping.
pub fn clamp_reference_url_count(requested: f64) -> usize {
    if requested.is_nan() {
        return MIN_REFERENCE_URLS;
    }
    requested
        .clamp(MIN_REFERENCE_URLS as f64, MAX_REFERENCE_URLS as f64)
        .trunc() as usize
}

/// LLM provider identifiers accepted by the analyze endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "gpt35")]
    Gpt35,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "gemini-light")]
    GeminiLight,
    #[serde(rename = "claude-sonnet")]
    ClaudeSonnet,
    #[serde(rename = "claude-haiku")]
    ClaudeHaiku,
}

/// The API family a provider belongs to (one adapter per family)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderFamily {
    OpenAi,
    Gemini,
    Claude,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 6] = [
        ProviderKind::OpenAi,
        ProviderKind::Gpt35,
        ProviderKind::Gemini,
        ProviderKind::GeminiLight,
        ProviderKind::ClaudeSonnet,
        ProviderKind::ClaudeHaiku,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gpt35 => "gpt35",
            ProviderKind::Gemini => "gemini",
            ProviderKind::GeminiLight => "gemini-light",
            ProviderKind::ClaudeSonnet => "claude-sonnet",
            ProviderKind::ClaudeHaiku => "claude-haiku",
        }
    }

    pub fn family(&self) -> ProviderFamily {
        match self {
            ProviderKind::OpenAi | ProviderKind::Gpt35 => ProviderFamily::OpenAi,
            ProviderKind::Gemini | ProviderKind::GeminiLight => ProviderFamily::Gemini,
            ProviderKind::ClaudeSonnet | ProviderKind::ClaudeHaiku => ProviderFamily::Claude,
        }
    }

    /// Default upstream model for this provider id
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o",
            ProviderKind::Gpt35 => "gpt-3.5-turbo",
            ProviderKind::Gemini => "gemini-1.5-pro",
            ProviderKind::GeminiLight => "gemini-1.5-flash",
            ProviderKind::ClaudeSonnet => "claude-3-5-sonnet-20241022",
            ProviderKind::ClaudeHaiku => "claude-3-haiku-20240307",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown provider: {}", s))
    }
}

/// A validated analysis request. Created per call, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub query: String,
    pub provider: ProviderKind,
    /// Always within `[1, 10]`
    pub reference_url_count: usize,
}

/// System + user prompt pair sent to a provider
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Token counts reported by a provider (zero-filled when not reported)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Normalized successful provider reply
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReply {
    /// Raw text content of the first message/content item
    pub content: String,
    pub usage: TokenUsage,
    /// Model that produced the reply
    pub model: String,
}

/// Usage metadata attached to an analysis response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageInfo {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
    pub model: String,
    pub processing_time_ms: u64,
}

/// Structured product report produced by a provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic: Option<BasicInfo>,
    #[serde(default)]
    pub good_points: Vec<ReportPoint>,
    #[serde(default)]
    pub bad_points: Vec<ReportPoint>,
    #[serde(default)]
    pub specifications: Specifications,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_info: Option<MetaInfo>,
}

impl ProductReport {
    /// Deterministic report substituted when the provider output cannot be parsed
    pub fn placeholder() -> Self {
        let point = ReportPoint {
            point: NOT_AVAILABLE.to_string(),
            description: NOT_FOUND.to_string(),
        };

        Self {
            basic: Some(BasicInfo {
                full_name: NOT_AVAILABLE.to_string(),
                manufacturer: NOT_AVAILABLE.to_string(),
                category: NOT_AVAILABLE.to_string(),
                price: Price {
                    current: NOT_AVAILABLE.to_string(),
                    original: NOT_AVAILABLE.to_string(),
                },
                release_date: NOT_AVAILABLE.to_string(),
            }),
            good_points: vec![point.clone()],
            bad_points: vec![point],
            specifications: Specifications::default(),
            meta_info: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicInfo {
    #[serde(default, deserialize_with = "lenient::string")]
    pub full_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub manufacturer: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub category: String,
    #[serde(default)]
    pub price: Price,
    #[serde(default, deserialize_with = "lenient::string")]
    pub release_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Price {
    #[serde(default, deserialize_with = "lenient::string")]
    pub current: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub original: String,
}

/// A good or bad point in a report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportPoint {
    #[serde(default, deserialize_with = "lenient::string")]
    pub point: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specifications {
    #[serde(
        default,
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub dimensions: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub weight: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub materials: Vec<String>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub power_source: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub standards: Vec<String>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub warranty: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_map")]
    pub additional_specs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaInfo {
    #[serde(default, deserialize_with = "lenient::string")]
    pub extraction_date: String,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub source_urls: Vec<String>,
}

/// Search engines the search orchestrator can dispatch to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngineKind {
    DuckDuckGo,
    Brave,
    Firecrawl,
}

impl SearchEngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchEngineKind::DuckDuckGo => "duckduckgo",
            SearchEngineKind::Brave => "brave",
            SearchEngineKind::Firecrawl => "firecrawl",
        }
    }
}

impl fmt::Display for SearchEngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchEngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "duckduckgo" | "ddg" => Ok(SearchEngineKind::DuckDuckGo),
            "brave" => Ok(SearchEngineKind::Brave),
            "firecrawl" => Ok(SearchEngineKind::Firecrawl),
            other => Err(format!("Unknown search engine: {}", other)),
        }
    }
}

/// A single normalized search result. `url` is unique within a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Adapter name or result category; `"Fallback"` marks synthetic filler
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_family: Option<bool>,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, url: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            description: None,
            source: source.into(),
            confidence: None,
            favicon: None,
            age: None,
            published_time: None,
            publisher: None,
            is_family: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = if description.is_empty() {
            None
        } else {
            Some(description)
        };
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Parameters for launching a deep research job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchOptions {
    pub max_depth: u32,
    pub time_limit: u32,
    pub max_urls: u32,
}

impl Default for ResearchOptions {
    fn default() -> Self {
        Self {
            max_depth: 5,
            time_limit: 180,
            max_urls: 15,
        }
    }
}

/// Status of a deep research job as reported by the crawl service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResearchStatus {
    #[default]
    #[serde(alias = "processing", alias = "pending")]
    InProgress,
    Completed,
    Failed,
}

/// Snapshot of a deep research job. Only the crawl service mutates the job;
/// clients read snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchJob {
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub status: ResearchStatus,
    #[serde(default)]
    pub current_depth: u32,
    #[serde(default)]
    pub max_depth: u32,
    #[serde(default)]
    pub progress_percentage: u8,
    #[serde(default)]
    pub data: ResearchData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl ResearchJob {
    /// Snapshot used when a freshly created job's status cannot be read yet
    pub fn initial(job_id: impl Into<String>, max_depth: u32) -> Self {
        Self {
            job_id: job_id.into(),
            status: ResearchStatus::InProgress,
            current_depth: 0,
            max_depth,
            progress_percentage: 0,
            data: ResearchData::default(),
            expires_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == ResearchStatus::Completed
    }

    /// Recompute `progress_percentage` from depth and status
    pub fn refresh_progress(&mut self) {
        self.progress_percentage = match self.status {
            ResearchStatus::Completed => 100,
            _ if self.max_depth == 0 => 0,
            _ => {
                let pct = (self.current_depth as f64 / self.max_depth as f64 * 100.0).round();
                pct.clamp(0.0, 100.0) as u8
            }
        };
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchData {
    #[serde(default)]
    pub activities: Vec<ResearchActivity>,
    #[serde(default)]
    pub sources: Vec<ResearchSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_analysis: Option<String>,
}

/// One step of a deep research job. Accepts both the crawl service's
/// `depth/type/message` naming and the `step/action/details` naming.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchActivity {
    #[serde(default, alias = "step")]
    pub depth: u32,
    #[serde(rename = "type", default, alias = "action")]
    pub kind: String,
    #[serde(default, alias = "details")]
    pub message: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchSource {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Result of a credential presence/validity probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyStatus {
    pub configured: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limited: Option<bool>,
}

impl KeyStatus {
    pub fn configured(message: impl Into<String>) -> Self {
        Self {
            configured: true,
            message: message.into(),
            rate_limited: None,
        }
    }

    pub fn missing(message: impl Into<String>) -> Self {
        Self {
            configured: false,
            message: message.into(),
            rate_limited: None,
        }
    }
}

/// Deserializers that accept whatever shape an LLM produced for text fields
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use std::collections::BTreeMap;

    fn to_text(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            Value::Array(items) => Some(
                items
                    .into_iter()
                    .filter_map(to_text)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            other => Some(other.to_string()),
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(to_text(Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn optional_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(to_text(Value::deserialize(d)?).filter(|s| !s.is_empty()))
    }

    pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items.into_iter().filter_map(to_text).collect(),
            Value::Null => Vec::new(),
            other => to_text(other).into_iter().collect(),
        })
    }

    pub fn string_map<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<BTreeMap<String, String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Object(map) => map
                .into_iter()
                .filter_map(|(k, v)| to_text(v).map(|v| (k, v)))
                .collect(),
            _ => BTreeMap::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_reference_url_count() {
        assert_eq!(clamp_reference_url_count(0.0), 1);
        assert_eq!(clamp_reference_url_count(-4.0), 1);
        assert_eq!(clamp_reference_url_count(5.0), 5);
        assert_eq!(clamp_reference_url_count(7.9), 7);
        assert_eq!(clamp_reference_url_count(15.0), 10);
        assert_eq!(clamp_reference_url_count(1e20), 10);
        assert_eq!(clamp_reference_url_count(f64::NAN), 1);
    }

    #[test]
    fn test_provider_kind_round_trips_through_str() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
        }
        assert!("gpt-5".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_report_accepts_loose_field_shapes() {
        let json = r#"{
            "basic": {"fullName": "iPhone 15 Pro", "price": {"current": 159800, "original": null}},
            "goodPoints": [{"point": "Light", "description": "Titanium frame"}],
            "badPoints": [],
            "specifications": {
                "weight": 187,
                "materials": "titanium",
                "additionalSpecs": {"chip": "A17 Pro", "cores": 6}
            }
        }"#;

        let report: ProductReport = serde_json::from_str(json).unwrap();
        let basic = report.basic.unwrap();
        assert_eq!(basic.price.current, "159800");
        assert_eq!(basic.price.original, "");
        assert_eq!(report.specifications.weight.as_deref(), Some("187"));
        assert_eq!(report.specifications.materials, vec!["titanium"]);
        assert_eq!(report.specifications.additional_specs["cores"], "6");
    }

    #[test]
    fn test_placeholder_uses_sentinels() {
        let report = ProductReport::placeholder();
        assert_eq!(report.good_points[0].point, NOT_AVAILABLE);
        assert_eq!(report.bad_points[0].description, NOT_FOUND);
        assert_eq!(report.basic.unwrap().full_name, NOT_AVAILABLE);
    }

    #[test]
    fn test_activity_accepts_both_namings() {
        let a: ResearchActivity = serde_json::from_str(
            r#"{"step": 2, "action": "search", "details": "initial search", "timestamp": "t"}"#,
        )
        .unwrap();
        let b: ResearchActivity = serde_json::from_str(
            r#"{"depth": 2, "type": "search", "message": "initial search", "timestamp": "t"}"#,
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_refresh_progress() {
        let mut job = ResearchJob::initial("job", 4);
        job.current_depth = 1;
        job.refresh_progress();
        assert_eq!(job.progress_percentage, 25);

        job.status = ResearchStatus::Completed;
        job.refresh_progress();
        assert_eq!(job.progress_percentage, 100);
    }
}
