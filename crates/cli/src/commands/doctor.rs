//! Doctor command - validate configuration and credentials

use anyhow::Result;
use product_scout_domain::{KeyStatus, ProviderFamily, ProviderKind};
use serde::Serialize;
use std::path::PathBuf;

use crate::args::DoctorArgs;
use crate::checks::{self, Service};
use crate::config::AppConfig;
use crate::wiring;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    llm: CheckResult,
    openai: CheckResult,
    gemini: CheckResult,
    claude: CheckResult,
    brave: CheckResult,
    firecrawl: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

/// Missing keys only degrade to mock data or a missing provider, so they warn
fn key_check(status: KeyStatus, fallback: &str) -> CheckResult {
    let rate_limited = status.rate_limited == Some(true);
    let result = match (status.configured, rate_limited) {
        (true, false) => CheckResult::ok(status.message),
        (true, true) => CheckResult::warn(status.message),
        (false, _) => CheckResult::warn(format!("{}; {}", status.message, fallback)),
    };

    if rate_limited {
        result.with_details(serde_json::json!({ "rateLimited": true }))
    } else {
        result
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let not_checked = || CheckResult::error("Not checked");
    let mut report = DoctorReport {
        config: not_checked(),
        llm: not_checked(),
        openai: not_checked(),
        gemini: not_checked(),
        claude: not_checked(),
        brave: not_checked(),
        firecrawl: not_checked(),
        overall: "error".to_string(),
    };

    // Check config
    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {:#}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.llm = check_llm(config);

        report.openai = key_check(
            checks::check_key(config, Service::OpenAi).await,
            "openai and gpt35 are unavailable",
        );
        report.gemini = key_check(
            checks::check_key(config, Service::Gemini).await,
            "gemini and gemini-light are unavailable",
        );
        report.claude = key_check(
            checks::check_key(config, Service::Claude).await,
            "claude-sonnet and claude-haiku are unavailable",
        );
        report.brave = key_check(
            checks::check_key(config, Service::Brave).await,
            "Brave searches serve mock data",
        );
        report.firecrawl = key_check(
            checks::check_key(config, Service::Firecrawl).await,
            "Firecrawl searches and deep research serve mock data",
        );
    }

    // Determine overall status
    let checks = [
        &report.config,
        &report.llm,
        &report.openai,
        &report.gemini,
        &report.claude,
        &report.brave,
        &report.firecrawl,
    ];

    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    // Output report
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

fn check_llm(config: &AppConfig) -> CheckResult {
    if config.llm.stub {
        return CheckResult::ok("Stub mode: every provider answers with canned reports");
    }

    let analyze_config = match wiring::analyze_config(config) {
        Ok(c) => c,
        Err(e) => return CheckResult::error(format!("{:#}", e)),
    };

    let providers = wiring::build_providers(config);
    let available: Vec<&str> = ProviderKind::ALL
        .iter()
        .filter(|kind| providers.contains(**kind))
        .map(|kind| kind.as_str())
        .collect();

    let details = serde_json::json!({
        "available": available,
        "fallbackProvider": analyze_config.fallback_provider.as_str(),
        "timeoutSecs": analyze_config.timeout.as_secs(),
    });

    if available.is_empty() {
        return CheckResult::warn("No LLM provider credentials configured").with_details(details);
    }

    let claude_available = providers.contains(ProviderKind::ClaudeSonnet);
    let fallback_available = providers.contains(analyze_config.fallback_provider);
    let result = if claude_available
        && !fallback_available
        && analyze_config.fallback_provider.family() != ProviderFamily::Claude
    {
        CheckResult::warn(format!(
            "Providers: {}; Claude failures cannot fall back to {}",
            available.join(", "),
            analyze_config.fallback_provider
        ))
    } else {
        CheckResult::ok(format!("Providers: {}", available.join(", ")))
    };

    result.with_details(details)
}

fn print_report(report: &DoctorReport) {
    println!("product-scout Doctor Report");
    println!("===========================");
    println!();

    print_check("Config", &report.config);
    print_check("LLM", &report.llm);
    print_check("OpenAI", &report.openai);
    print_check("Gemini", &report.gemini);
    print_check("Claude", &report.claude);
    print_check("Brave Search", &report.brave);
    print_check("Firecrawl", &report.firecrawl);

    println!();
    let symbol = match report.overall.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} Overall: {}", symbol, report.overall.to_uppercase());

    if report.overall != "error" {
        println!();
        println!("Ready! Try: product-scout analyze --query \"iPhone 15 Pro\"");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    let symbol = match result.status.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} {}: {}", symbol, name, result.message);
}
