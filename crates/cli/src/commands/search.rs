//! Search command - run one search engine

use anyhow::{Context, Result};
use product_scout_domain::SystemClock;
use product_scout_domain::usecases::SearchResponse;
use std::path::PathBuf;
use std::sync::Arc;

use crate::args::SearchArgs;
use crate::config::AppConfig;
use crate::wiring;

pub async fn execute(args: SearchArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let usecase = wiring::build_search(&config, Arc::new(SystemClock));

    tracing::info!(engine = %args.engine, "Searching");
    let response = usecase
        .search(args.engine, &args.query)
        .await
        .with_context(|| format!("{} search failed", args.engine))?;

    if args.json {
        let json = serde_json::to_string_pretty(&response).context("Failed to serialize output")?;
        println!("{}", json);
    } else {
        print_results(&response);
    }

    Ok(())
}

fn print_results(response: &SearchResponse) {
    println!(
        "Search Results ({}, {} ms)",
        response.engine, response.processing_time_ms
    );
    println!("==============");
    println!();

    if let Some(reason) = &response.fallback_reason {
        println!("Fell back from {}: {}", response.requested_engine, reason);
    }
    if response.is_mock_data {
        println!("Note: showing mock data");
    }
    if let Some(error) = &response.error {
        println!("Warning: {}", error);
    }

    for (i, result) in response.results.iter().enumerate() {
        println!("{:>2}. {} [{}]", i + 1, result.title, result.source);
        println!("    {}", result.url);
        if let Some(description) = &result.description {
            println!("    {}", description);
        }
    }

    if response.results.is_empty() {
        println!("No results.");
    }
}
