use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides.
///
/// `CINECACHE_SECTION__KEY` overrides `[section] key`, e.g.
/// `CINECACHE_TMDB__ACCESS_TOKEN`. The bare `TMDB_TOKEN` and `API_KEY`
/// variables are honored too.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::raw().only(&["TMDB_TOKEN", "API_KEY"]).map(|key| {
            if key.as_str().eq_ignore_ascii_case("TMDB_TOKEN") {
                "tmdb.access_token".into()
            } else {
                "auth.api_key".into()
            }
        }))
        .merge(Env::prefixed("CINECACHE_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
