//! # Application Configuration
//!
//! Loads the `AppConfig` for the `stockquery` binary from layered sources:
//! built-in defaults, an optional `config.yml` with `${VAR}` substitution,
//! a handful of plain environment variables and finally `STOCKQUERY_`
//! prefixed variables for any nested key.

use config::{Config as ConfigBuilder, Environment, File, FileFormat, Map};
use regex::Regex;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use stockquery::AppConfig;
use tracing::info;

/// The file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Plain environment variables and the configuration keys they set.
const PLAIN_ENV_KEYS: &[(&str, &str)] = &[
    ("DB_PATH", "DB_PATH"),
    ("CACHE_DIR", "CACHE_DIR"),
    ("ROW_LIMIT", "ROW_LIMIT"),
    ("CONTEXT_EXAMPLES", "CONTEXT_EXAMPLES"),
    ("AI_PROVIDER", "GENERATOR__PROVIDER"),
    ("AI_API_URL", "GENERATOR__API_URL"),
    ("AI_API_KEY", "GENERATOR__API_KEY"),
    ("AI_MODEL", "GENERATOR__MODEL_NAME"),
];

static ENV_VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}").expect("env var regex is valid")
});

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates an explicitly requested configuration file was not found.
    NotFound(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

// Reads a file and substitutes `${VAR}` with the environment value (empty when unset).
// Returns Ok(None) if the file does not exist.
fn read_and_substitute(path: &Path) -> Result<Option<String>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|e| {
        ConfigError::General(format!(
            "Failed to read config file '{}': {e}",
            path.display()
        ))
    })?;
    let expanded = ENV_VAR_RE.replace_all(&content, |caps: &regex::Captures| {
        env::var(&caps["var"]).unwrap_or_default()
    });
    Ok(Some(expanded.into_owned()))
}

fn plain_env_source() -> Map<String, String> {
    PLAIN_ENV_KEYS
        .iter()
        .filter_map(|(var, key)| {
            let value = env::var(var).ok().filter(|v| !v.trim().is_empty())?;
            Some((key.to_string(), value))
        })
        .collect()
}

/// Treats blank optional strings as unset, which is what an unset `${VAR}`
/// in the YAML file produces.
fn drop_blank(value: &mut Option<String>) {
    if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
        *value = None;
    }
}

/// Loads the application configuration.
///
/// - `config_path_override` must exist when given; otherwise `config.yml` in
///   the working directory is used if present.
/// - `DB_PATH`, `CACHE_DIR`, `ROW_LIMIT`, `CONTEXT_EXAMPLES` and the
///   `AI_PROVIDER`/`AI_API_URL`/`AI_API_KEY`/`AI_MODEL` variables override the file.
/// - `STOCKQUERY_...` variables override everything, `__` separating nested
///   keys (e.g. `STOCKQUERY_GENERATOR__MAX_TOKENS`).
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let defaults = AppConfig::default();
    let mut builder = ConfigBuilder::builder()
        // Layer 1: Programmatic defaults.
        .set_default("db_path", defaults.db_path.clone())?
        .set_default("cache_dir", defaults.cache_dir.clone())?
        .set_default("row_limit", i64::from(defaults.row_limit))?
        .set_default("context_examples", defaults.context_examples as i64)?;

    // Layer 2: The YAML file.
    let config_path = config_path_override.unwrap_or(DEFAULT_CONFIG_FILE);
    match read_and_substitute(Path::new(config_path))? {
        Some(content) => {
            info!("Loading configuration from '{config_path}'.");
            builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
        }
        None if config_path_override.is_some() => {
            return Err(ConfigError::NotFound(format!(
                "Config file not found at '{config_path}'."
            )));
        }
        None => info!("No '{config_path}' found, using defaults and environment."),
    }

    let settings = builder
        // Layer 3: Plain environment variables.
        .add_source(
            Environment::default()
                .source(Some(plain_env_source()))
                .try_parsing(true)
                .separator("__"),
        )
        // Layer 4: Prefixed environment variables for any key.
        .add_source(
            Environment::with_prefix("STOCKQUERY")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    let mut config: AppConfig = settings.try_deserialize()?;
    drop_blank(&mut config.generator.api_url);
    drop_blank(&mut config.generator.api_key);
    drop_blank(&mut config.generator.model_name);
    if config.generator.provider.trim().is_empty() {
        config.generator.provider = defaults.generator.provider;
    }
    Ok(config)
}
