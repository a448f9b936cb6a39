//! Analyze command - one-shot product report

use anyhow::{Context, Result};
use product_scout_domain::usecases::{AnalysisResponse, AnalyzeInput};
use product_scout_domain::{ReportPoint, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;

use crate::args::AnalyzeArgs;
use crate::config::AppConfig;
use crate::wiring;

pub async fn execute(args: AnalyzeArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let usecase = wiring::build_analyze(&config, Arc::new(SystemClock))?;

    let input = AnalyzeInput {
        query: Some(args.query),
        provider: Some(args.provider),
        reference_url_count: args.reference_url_count,
    };

    tracing::info!(provider = ?input.provider, "Analyzing product");
    let response = usecase.analyze(&input).await.context("Analysis failed")?;

    if args.json {
        let json = serde_json::to_string_pretty(&response).context("Failed to serialize output")?;
        println!("{}", json);
    } else {
        print_report(&response);
    }

    Ok(())
}

fn print_points(title: &str, points: &[ReportPoint]) {
    println!("{}:", title);
    if points.is_empty() {
        println!("  (none)");
    }
    for point in points {
        println!("  - {}: {}", point.point, point.description);
    }
    println!();
}

fn print_report(response: &AnalysisResponse) {
    let report = &response.report;

    println!("Product Report");
    println!("==============");
    println!();

    if let Some(basic) = &report.basic {
        println!("Name:         {}", basic.full_name);
        println!("Manufacturer: {}", basic.manufacturer);
        println!("Category:     {}", basic.category);
        println!(
            "Price:        {} (original {})",
            basic.price.current, basic.price.original
        );
        println!("Released:     {}", basic.release_date);
        println!();
    }

    print_points("Good points", &report.good_points);
    print_points("Bad points", &report.bad_points);

    let specs = &report.specifications;
    let fields = [
        ("Dimensions", &specs.dimensions),
        ("Weight", &specs.weight),
        ("Power source", &specs.power_source),
        ("Warranty", &specs.warranty),
    ];
    println!("Specifications:");
    for (label, value) in fields {
        if let Some(value) = value {
            println!("  {}: {}", label, value);
        }
    }
    if !specs.materials.is_empty() {
        println!("  Materials: {}", specs.materials.join(", "));
    }
    if !specs.standards.is_empty() {
        println!("  Standards: {}", specs.standards.join(", "));
    }
    for (key, value) in &specs.additional_specs {
        println!("  {}: {}", key, value);
    }
    println!();

    if !response.urls.used.is_empty() {
        println!("Reference URLs:");
        for url in &response.urls.used {
            println!("  - {}", url);
        }
        println!();
    }

    let usage = &response.usage;
    println!(
        "Provider: {} ({}), tokens: {} in / {} out, estimated cost: ${:.4}, {} ms",
        response.provider,
        usage.model,
        usage.prompt_tokens,
        usage.completion_tokens,
        usage.total_cost,
        usage.processing_time_ms
    );

    if let Some(fallback) = &response.fallback {
        println!(
            "Note: {} failed ({}), answered by {}",
            fallback.from, fallback.reason, fallback.to
        );
    }
    if let Some(error) = &response.error {
        println!("Warning: {}", error);
    }
}
