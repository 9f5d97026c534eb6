pub mod config;
pub mod filter;
pub mod metrics;
pub mod normalize;
pub mod orchestrator;
pub mod store;
pub mod testing;
pub mod upstream;

pub use config::{
    load_config, load_config_from_str, validate_config, AuthConfig, Config, ConfigError,
    DatabaseConfig, SanitizedConfig, ServerConfig,
};
pub use filter::{build_filter_query, FilterQuery, MovieFilter, SortField, SortOrder, SortSpec};
pub use normalize::normalize_query;
pub use orchestrator::{
    CatalogError, CatalogService, CatalogStats, FailedUpsert, MovieListing, SearchResult,
    UpsertReport,
};
pub use store::{
    MediaType, Movie, MovieStore, MovieSuggestion, NewQueryPage, PageInsert, QueryPage,
    QueryPageCache, SqliteStore, StoreError,
};
pub use upstream::{
    MovieSource, SearchPage, TmdbClient, TmdbConfig, UnconfiguredSource, UpstreamError,
};
