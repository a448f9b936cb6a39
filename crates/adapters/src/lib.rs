//! product-scout adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `llm`: LLM provider adapters (OpenAI, Anthropic, Gemini, stub)
//! - `search`: DuckDuckGo, Brave and Firecrawl search adapters, plus the
//!   Firecrawl deep research client

pub mod llm;
pub mod search;
