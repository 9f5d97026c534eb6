use cinecache_core::{CatalogService, Config, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    catalog: CatalogService,
}

impl AppState {
    pub fn new(config: Config, catalog: CatalogService) -> Self {
        Self { config, catalog }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    /// Key every `/api/v1` request must present, if any.
    pub fn api_key(&self) -> Option<&str> {
        self.config.auth.api_key.as_deref()
    }
}
