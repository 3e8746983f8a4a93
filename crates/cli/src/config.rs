//! # CLI Configuration
//!
//! Loads `askdb` settings in layers: programmatic defaults, an optional YAML file
//! (with `${VAR}` substitution from the environment), then `ASKDB_...` environment
//! variables. Provider entries are partial updates applied on top of the
//! environment-initialized `ConfigStore`.

use askdb::{ConfigStore, ProviderConfigUpdate};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use thiserror::Error;
use tracing::{info, warn};

/// The file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "askdb.yml";

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    #[error("Configuration error: {0}")]
    General(String),
    /// Indicates an explicitly requested configuration file was not found.
    #[error("{0}")]
    NotFound(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `askdb.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Path of the SQLite database to introspect and query.
    pub db_url: String,
    /// Provider used when `--provider` is not given.
    pub default_provider: String,
    /// SQL dialect named in the prompt.
    pub dialect: String,
    /// Upper bound for a single provider request.
    pub request_timeout_secs: u64,
    /// Partial provider configurations keyed by provider id.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfigUpdate>,
}

impl AppConfig {
    /// Builds the provider store from the environment, then applies file overrides.
    ///
    /// Empty values (e.g. from an unset `${VAR}`) are ignored.
    pub fn build_store(&self) -> Result<ConfigStore, askdb::PromptError> {
        let store = ConfigStore::from_env();
        for (provider, update) in &self.providers {
            let update = ProviderConfigUpdate {
                api_key: non_empty(&update.api_key),
                model_name: non_empty(&update.model_name),
                api_url: non_empty(&update.api_url),
            };
            if update.is_empty() {
                continue;
            }
            store.update_config(provider, &update)?;
        }
        Ok(store)
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

// Reads a file and substitutes `${VAR}` references from the environment.
// Returns Ok(None) if the file does not exist.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}")
        .map_err(|e| ConfigError::General(e.to_string()))?;
    let expanded_content = re.replace_all(&content, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_else(|_| {
            warn!("Config references unset variable '{var_name}'.");
            String::new()
        })
    });

    Ok(Some(expanded_content.to_string()))
}

/// Loads the application configuration.
///
/// - An explicit `config_path` must exist; otherwise `askdb.yml` is used when present.
/// - Keys are overridden by `ASKDB_...` variables, nested with `__`
///   (e.g. `ASKDB_PROVIDERS__OPENAI__MODEL_NAME`).
pub fn get_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();

    let mut builder = ConfigBuilder::builder()
        .set_default("db_url", "db/askdb.db")?
        .set_default("default_provider", "openai")?
        .set_default("dialect", "SQLite")?
        .set_default("request_timeout_secs", 60_i64)?;

    let path = config_path.unwrap_or(DEFAULT_CONFIG_FILE);
    match read_and_substitute(path)? {
        Some(content) => {
            info!("Loading configuration from '{path}'.");
            builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
        }
        None if config_path.is_some() => {
            return Err(ConfigError::NotFound(format!(
                "Config file not found at '{path}'."
            )));
        }
        None => {}
    }

    let settings = builder
        .add_source(
            Environment::with_prefix("ASKDB")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
