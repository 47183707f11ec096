use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Env variable names the pipeline has always read, mapped onto config keys.
const ENV_ALIASES: &[(&str, &str)] = &[
    ("AWS_BUCKET_NAME", "storage.bucket"),
    ("AWS_REGION", "storage.region"),
    ("SNOWFLAKE_STAGE", "warehouse.stage"),
];

fn env_providers(figment: Figment) -> Figment {
    let aliases = Env::raw()
        .only(&ENV_ALIASES.iter().map(|(name, _)| *name).collect::<Vec<_>>())
        .map(|key| {
            ENV_ALIASES
                .iter()
                .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
                .map(|(_, target)| (*target).into())
                .unwrap_or_else(|| key.into())
        });

    figment
        .merge(aliases)
        .merge(Env::prefixed("HOOPLINE_").split("__"))
}

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    env_providers(Figment::new().merge(Toml::file(path)))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from environment variables only
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    env_providers(Figment::new())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
