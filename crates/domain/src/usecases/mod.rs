//! Application use cases / business logic

pub mod analyze;
pub mod research;
pub mod research_poll;
pub mod search;

pub use analyze::{
    AnalysisResponse, AnalyzeConfig, AnalyzeError, AnalyzeInput, AnalyzeUseCase, FallbackInfo,
    ProviderSet, UrlsInfo,
};
pub use research::{ResearchStatusUseCase, StatusReport};
pub use research_poll::{
    format_elapsed, PollHandle, PollState, ResearchObserver, ResearchPoller,
    DEFAULT_POLL_INTERVAL,
};
pub use search::{DeepResearchLaunch, SearchResponse, SearchUseCase};
