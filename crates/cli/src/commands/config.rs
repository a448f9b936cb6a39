//! Config command - configuration management

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::PathBuf;

use crate::args::{ConfigArgs, ConfigCommands};
use crate::checks::{self, Service};
use crate::config::AppConfig;

pub async fn execute(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Init { path, force } => init_config(path, force).await,
    }
}

async fn init_config(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    fs::write(&path, AppConfig::example_toml())
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    // Read it back so a broken template never reaches the user silently
    let config = AppConfig::load(Some(&path))
        .with_context(|| format!("Generated config does not load: {}", path.display()))?;

    println!("Created config file: {}", path.display());
    println!();

    let env = checks::env_check(&config);
    println!("API keys (read from the environment):");
    for service in Service::ALL {
        let state = if env.is_set(service) { "set" } else { "not set" };
        println!(
            "  {:<13} {} ({})",
            service.label(),
            service.api_key_env(&config),
            state
        );
    }

    println!();
    println!("Next steps:");
    println!("  1. Export the API keys you have; missing search keys serve mock data");
    println!("  2. Run 'product-scout doctor' to check every service");
    println!("  3. Run 'product-scout analyze --query \"iPhone 15 Pro\"' to test");
    println!("  4. Run 'product-scout serve' to start the HTTP API");

    Ok(())
}
