//! Builds adapters and use cases from configuration

use anyhow::{Context, Result, anyhow, bail};
use product_scout_adapters::{
    llm::{
        AnthropicProvider, GeminiProvider, LlmConfig as AdapterLlmConfig, OpenAiProvider,
        StubProvider, anthropic, gemini, openai,
    },
    search::{BraveSearch, DuckDuckGoSearch, FirecrawlClient, brave, duckduckgo, firecrawl},
};
use product_scout_domain::usecases::{
    AnalyzeConfig, AnalyzeUseCase, ProviderSet, ResearchStatusUseCase, SearchUseCase,
};
use product_scout_domain::{
    Clock, FallbackDomains, LlmProvider, PriceRow, PriceTable, ProviderFamily, ProviderKind,
    ResearchClient, ResearchOptions, SearchAdapter,
};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, PriceOverride, ProviderConfig};

pub(crate) fn load_api_key(env_var: &str, service: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No API key env var configured for {}", service);
    }

    let key = std::env::var(env_var)
        .with_context(|| format!("Missing API key env var {} for {}", env_var, service))?;

    if key.trim().is_empty() {
        bail!("API key env var {} is empty for {}", env_var, service);
    }

    Ok(SecretString::new(key.into()))
}

/// Like [`load_api_key`], but an absent credential is not an error
pub(crate) fn optional_api_key(env_var: &str, service: &str) -> Option<SecretString> {
    match load_api_key(env_var, service) {
        Ok(key) => Some(key),
        Err(e) => {
            tracing::debug!(service, error = %e, "Credential not available");
            None
        }
    }
}

fn base_url_or(configured: &str, default: &str) -> String {
    if configured.trim().is_empty() {
        default.to_string()
    } else {
        configured.trim().to_string()
    }
}

pub(crate) fn provider_settings(config: &AppConfig, family: ProviderFamily) -> &ProviderConfig {
    match family {
        ProviderFamily::OpenAi => &config.llm.openai,
        ProviderFamily::Gemini => &config.llm.gemini,
        ProviderFamily::Claude => &config.llm.claude,
    }
}

fn model_for(config: &AppConfig, kind: ProviderKind) -> String {
    config
        .llm
        .models
        .get(kind.as_str())
        .filter(|model| !model.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| kind.default_model().to_string())
}

fn adapter_llm_config(config: &AppConfig, kind: ProviderKind) -> AdapterLlmConfig {
    AdapterLlmConfig {
        model: model_for(config, kind),
        temperature: config.llm.temperature,
        max_output_tokens: config.llm.max_output_tokens,
        timeout_secs: config.llm.timeout_secs,
    }
}

/// One provider per id whose credential is present. With `llm.stub` every id
/// is answered by the offline stub.
pub fn build_providers(config: &AppConfig) -> ProviderSet {
    let mut providers = ProviderSet::new();

    for kind in ProviderKind::ALL {
        if config.llm.stub {
            providers = providers.with(kind, Arc::new(StubProvider::canned()));
            continue;
        }

        let settings = provider_settings(config, kind.family());
        let Some(key) = optional_api_key(&settings.api_key_env, kind.as_str()) else {
            continue;
        };
        let llm_config = adapter_llm_config(config, kind);

        let provider: Arc<dyn LlmProvider> = match kind.family() {
            ProviderFamily::OpenAi => Arc::new(OpenAiProvider::with_base_url(
                key,
                base_url_or(&settings.base_url, openai::DEFAULT_BASE_URL),
                llm_config,
            )),
            ProviderFamily::Gemini => Arc::new(GeminiProvider::with_base_url(
                key,
                base_url_or(&settings.base_url, gemini::DEFAULT_BASE_URL),
                llm_config,
            )),
            ProviderFamily::Claude => Arc::new(AnthropicProvider::with_base_url(
                key,
                base_url_or(&settings.base_url, anthropic::DEFAULT_BASE_URL),
                llm_config,
            )),
        };
        providers = providers.with(kind, provider);
    }

    providers
}

fn apply_override(base: PriceRow, price: &PriceOverride) -> PriceRow {
    match price.per_1k {
        Some(per_1k) => PriceRow::blended(base.tier, per_1k),
        None => PriceRow::new(
            base.tier,
            price.input_per_1k.unwrap_or(base.input_per_1k),
            price.output_per_1k.unwrap_or(base.output_per_1k),
        ),
    }
}

pub fn price_table(config: &AppConfig) -> PriceTable {
    config
        .pricing
        .iter()
        .fold(PriceTable::default(), |table, (provider, price)| {
            let row = apply_override(table.row(provider), price);
            table.with_row(provider.clone(), row)
        })
}

pub fn analyze_config(config: &AppConfig) -> Result<AnalyzeConfig> {
    let fallback_provider = config
        .llm
        .fallback_provider
        .parse::<ProviderKind>()
        .map_err(|e| anyhow!(e))
        .context("Invalid llm.fallback_provider")?;

    Ok(AnalyzeConfig {
        timeout: Duration::from_secs(config.llm.timeout_secs),
        fallback_provider,
    })
}

pub fn build_analyze(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<AnalyzeUseCase> {
    let providers = build_providers(config);
    if providers.is_empty() {
        tracing::warn!("No LLM provider credentials configured");
    }

    Ok(AnalyzeUseCase::new(
        providers,
        Arc::new(price_table(config)),
        clock,
        analyze_config(config)?,
    ))
}

fn firecrawl_client(config: &AppConfig) -> Option<Arc<FirecrawlClient>> {
    let settings = &config.search.firecrawl;
    optional_api_key(&settings.api_key_env, "firecrawl").map(|key| {
        Arc::new(FirecrawlClient::with_base_url(
            key,
            base_url_or(&settings.base_url, firecrawl::DEFAULT_BASE_URL),
        ))
    })
}

pub(crate) fn brave_search(config: &AppConfig) -> Option<BraveSearch> {
    let settings = &config.search.brave;
    optional_api_key(&settings.api_key_env, "brave").map(|key| {
        BraveSearch::with_base_url(key, base_url_or(&settings.base_url, brave::DEFAULT_BASE_URL))
    })
}

pub fn build_search(config: &AppConfig, clock: Arc<dyn Clock>) -> SearchUseCase {
    let duckduckgo = Arc::new(DuckDuckGoSearch::with_base_url(base_url_or(
        &config.search.duckduckgo.base_url,
        duckduckgo::DEFAULT_BASE_URL,
    )));
    let brave = brave_search(config).map(|b| Arc::new(b) as Arc<dyn SearchAdapter>);
    let firecrawl = firecrawl_client(config);

    SearchUseCase::new(duckduckgo, clock)
        .with_brave(brave)
        .with_firecrawl(firecrawl.clone().map(|c| c as Arc<dyn SearchAdapter>))
        .with_research(firecrawl.map(|c| c as Arc<dyn ResearchClient>))
        .with_fallback_domains(FallbackDomains::new(config.search.fallback_domains.clone()))
}

pub fn build_research_status(config: &AppConfig, clock: Arc<dyn Clock>) -> ResearchStatusUseCase {
    let client = firecrawl_client(config).map(|c| c as Arc<dyn ResearchClient>);
    ResearchStatusUseCase::new(client, clock)
}

pub fn research_options(config: &AppConfig) -> ResearchOptions {
    ResearchOptions {
        max_depth: config.research.max_depth,
        time_limit: config.research.time_limit,
        max_urls: config.research.max_urls,
    }
}
