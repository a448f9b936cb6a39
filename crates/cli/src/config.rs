//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub research: ResearchConfig,

    /// Per-provider price overrides, keyed by provider id
    #[serde(default)]
    pub pricing: HashMap<String, PriceOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Answer every provider with the offline stub
    #[serde(default)]
    pub stub: bool,

    /// Provider used when a Claude call fails
    #[serde(default = "default_fallback_provider")]
    pub fallback_provider: String,

    /// Model overrides keyed by provider id
    #[serde(default)]
    pub models: HashMap<String, String>,

    #[serde(default = "default_openai")]
    pub openai: ProviderConfig,

    #[serde(default = "default_gemini")]
    pub gemini: ProviderConfig,

    #[serde(default = "default_claude")]
    pub claude: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key_env: String,

    #[serde(default)]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_duckduckgo")]
    pub duckduckgo: EngineConfig,

    #[serde(default = "default_brave")]
    pub brave: EngineConfig,

    #[serde(default = "default_firecrawl")]
    pub firecrawl: EngineConfig,

    /// Domains used for filler entries; empty keeps the built-in rotation
    #[serde(default)]
    pub fallback_domains: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub api_key_env: String,

    #[serde(default)]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    #[serde(default = "default_time_limit")]
    pub time_limit: u32,

    #[serde(default = "default_max_urls")]
    pub max_urls: u32,
}

/// USD per 1K tokens. `per_1k` sets a blended rate for both directions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceOverride {
    #[serde(default)]
    pub input_per_1k: Option<f64>,

    #[serde(default)]
    pub output_per_1k: Option<f64>,

    #[serde(default)]
    pub per_1k: Option<f64>,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_timeout() -> u64 {
    60
}

fn default_temperature() -> f64 {
    0.2
}

fn default_max_output_tokens() -> u32 {
    2000
}

fn default_fallback_provider() -> String {
    "openai".to_string()
}

fn provider(api_key_env: &str, base_url: &str) -> ProviderConfig {
    ProviderConfig {
        api_key_env: api_key_env.to_string(),
        base_url: base_url.to_string(),
    }
}

fn default_openai() -> ProviderConfig {
    provider("OPENAI_API_KEY", "https://api.openai.com/v1")
}

fn default_gemini() -> ProviderConfig {
    provider(
        "GEMINI_API_KEY",
        "https://generativelanguage.googleapis.com/v1beta",
    )
}

fn default_claude() -> ProviderConfig {
    provider("CLAUDE_API_KEY", "https://api.anthropic.com/v1")
}

fn engine(api_key_env: &str, base_url: &str) -> EngineConfig {
    EngineConfig {
        api_key_env: api_key_env.to_string(),
        base_url: base_url.to_string(),
    }
}

fn default_duckduckgo() -> EngineConfig {
    engine("", "https://api.duckduckgo.com")
}

fn default_brave() -> EngineConfig {
    engine("BRAVE_SEARCH_API_KEY", "https://api.search.brave.com")
}

fn default_firecrawl() -> EngineConfig {
    engine("FIRECRAWL_API_KEY", "https://api.firecrawl.dev/v1")
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_depth() -> u32 {
    5
}

fn default_time_limit() -> u32 {
    180
}

fn default_max_urls() -> u32 {
    15
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            stub: false,
            fallback_provider: default_fallback_provider(),
            models: HashMap::new(),
            openai: default_openai(),
            gemini: default_gemini(),
            claude: default_claude(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            duckduckgo: default_duckduckgo(),
            brave: default_brave(),
            firecrawl: default_firecrawl(),
            fallback_domains: vec![],
        }
    }
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_depth: default_max_depth(),
            time_limit: default_time_limit(),
            max_urls: default_max_urls(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("PRODUCT_SCOUT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# product-scout configuration
# API keys are read from the environment variables named below, never from this file.

[general]
log_level = "info"

[server]
host = "127.0.0.1"
port = 3000

[llm]
timeout_secs = 60
temperature = 0.2
max_output_tokens = 2000
# Answer every provider with canned offline reports
stub = false
# Provider used when claude-sonnet or claude-haiku fails
fallback_provider = "openai"

[llm.models]
# openai = "gpt-4o"
# gpt35 = "gpt-3.5-turbo"
# gemini = "gemini-1.5-pro"
# gemini-light = "gemini-1.5-flash"
# claude-sonnet = "claude-3-5-sonnet-20241022"
# claude-haiku = "claude-3-haiku-20240307"

[llm.openai]
api_key_env = "OPENAI_API_KEY"
base_url = "https://api.openai.com/v1"

[llm.gemini]
api_key_env = "GEMINI_API_KEY"
base_url = "https://generativelanguage.googleapis.com/v1beta"

[llm.claude]
api_key_env = "CLAUDE_API_KEY"
base_url = "https://api.anthropic.com/v1"

[search]
# Domains used to pad short result lists; empty keeps the built-in rotation
fallback_domains = []

[search.duckduckgo]
base_url = "https://api.duckduckgo.com"

[search.brave]
api_key_env = "BRAVE_SEARCH_API_KEY"
base_url = "https://api.search.brave.com"

[search.firecrawl]
api_key_env = "FIRECRAWL_API_KEY"
base_url = "https://api.firecrawl.dev/v1"

[research]
poll_interval_ms = 1000
max_depth = 5
time_limit = 180
max_urls = 15

# USD per 1K tokens
# [pricing.openai]
# input_per_1k = 0.01
# output_per_1k = 0.03
#
# [pricing.gemini]
# per_1k = 0.0035
"#
        .to_string()
    }
}
