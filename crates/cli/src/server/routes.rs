//! API routes definition

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::SharedState;
use super::handlers;

pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/analyze", post(handlers::analyze))
        // Search engines
        .route("/search", get(handlers::search))
        .route("/search-brave", get(handlers::search_brave))
        .route("/search-firecrawl", get(handlers::search_firecrawl))
        .route("/research-status", get(handlers::research_status))
        // Credential probes
        .route("/check-openai-key", get(handlers::check_openai_key))
        .route("/check-gemini-key", get(handlers::check_gemini_key))
        .route("/check-claude-key", get(handlers::check_claude_key))
        .route("/check-brave-key", get(handlers::check_brave_key))
        .route("/check-firecrawl-key", get(handlers::check_firecrawl_key))
        .route("/env-check", get(handlers::env_check))
        .with_state(state)
}

/// Router with open CORS and request tracing
pub fn create_router_with_middleware(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
