//! HTTP API over the analyze, search and research use cases

mod handlers;
mod routes;

pub use routes::create_router_with_middleware;

use anyhow::{Context, Result};
use product_scout_domain::usecases::{AnalyzeUseCase, ResearchStatusUseCase, SearchUseCase};
use product_scout_domain::{Clock, ResearchOptions, SystemClock};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::wiring;

/// Shared application state. Use cases hold no per-request state.
pub struct AppState {
    pub analyze: AnalyzeUseCase,
    pub search: SearchUseCase,
    pub research: ResearchStatusUseCase,
    /// Used for deep research parameters the caller leaves out
    pub research_defaults: ResearchOptions,
    pub config: AppConfig,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        Ok(Self {
            analyze: wiring::build_analyze(&config, clock.clone())?,
            search: wiring::build_search(&config, clock.clone()),
            research: wiring::build_research_status(&config, clock),
            research_defaults: wiring::research_options(&config),
            config,
        })
    }
}

/// Bind `addr` (`host:port`) and serve until Ctrl+C
pub async fn serve(state: SharedState, addr: &str) -> Result<()> {
    let app = create_router_with_middleware(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let local = listener
        .local_addr()
        .with_context(|| format!("Failed to read local address for {}", addr))?;
    tracing::info!("Server listening on http://{}", local);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server terminated with an error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
