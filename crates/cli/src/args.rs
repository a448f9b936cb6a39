//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use product_scout_domain::SearchEngineKind;
use std::path::PathBuf;

/// product-scout: LLM product reports, web search with fallbacks and deep research
#[derive(Parser, Debug)]
#[command(name = "product-scout")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API
    Serve(ServeArgs),

    /// Generate a product report with an LLM provider
    Analyze(AnalyzeArgs),

    /// Search the web with one engine
    Search(SearchArgs),

    /// Launch a deep research job and follow it to completion
    Research(ResearchArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Check credentials for every external service
    Doctor(DoctorArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind (overrides server.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides server.port)
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Product name, optionally followed by reference URLs
    #[arg(long)]
    pub query: String,

    /// Provider id (openai, gpt35, gemini, gemini-light, claude-sonnet, claude-haiku)
    #[arg(long, default_value = "openai")]
    pub provider: String,

    /// Number of reference URLs forwarded to the provider (clamped to 1-10)
    #[arg(long, allow_negative_numbers = true)]
    pub reference_url_count: Option<f64>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query
    #[arg(long)]
    pub query: String,

    /// Engine (duckduckgo, brave, firecrawl)
    #[arg(long, default_value = "duckduckgo")]
    pub engine: SearchEngineKind,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ResearchArgs {
    /// Research topic
    #[arg(long)]
    pub query: String,

    /// Maximum research depth (defaults to research.max_depth)
    #[arg(long)]
    pub max_depth: Option<u32>,

    /// Time limit in seconds (defaults to research.time_limit)
    #[arg(long)]
    pub time_limit: Option<u32>,

    /// Maximum URLs to analyze (defaults to research.max_urls)
    #[arg(long)]
    pub max_urls: Option<u32>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
