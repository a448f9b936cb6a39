//! product-scout domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `usecases`: Analyze/search orchestration and deep research polling
//! - `json_extract`, `pricing`, `urls`, `results`, `mock`, `prompt`: pure helpers
//!   used by the use cases

pub mod json_extract;
pub mod mock;
pub mod model;
pub mod ports;
pub mod pricing;
pub mod prompt;
pub mod results;
pub mod search_log;
pub mod urls;
pub mod usecases;

pub use json_extract::extract_json;
pub use model::*;
pub use ports::*;
pub use pricing::{CostBreakdown, PriceRow, PriceTable, PriceTier};
pub use results::FallbackDomains;
pub use search_log::SearchLog;
pub use urls::extract_urls;
