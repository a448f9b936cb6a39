//! Serve command - run the HTTP API

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use crate::args::ServeArgs;
use crate::checks::{self, Service};
use crate::config::AppConfig;
use crate::server::{self, AppState};

pub async fn execute(args: ServeArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);

    let env = checks::env_check(&config);
    tracing::info!(
        openai = env.openai,
        gemini = env.gemini,
        claude = env.claude,
        brave = env.brave,
        firecrawl = env.firecrawl,
        stub = config.llm.stub,
        "Credentials detected"
    );
    for service in [Service::Brave, Service::Firecrawl] {
        if !env.is_set(service) {
            tracing::warn!(
                service = service.as_str(),
                env_var = service.api_key_env(&config),
                "No API key, mock data will be served"
            );
        }
    }

    let state = Arc::new(AppState::from_config(config)?);
    server::serve(state, &format!("{}:{}", host, port)).await
}
