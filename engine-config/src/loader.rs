//! Configuration loading logic.
//!
//! Handles loading the config from a TOML file and applying environment
//! variable overrides.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::structs::{ConfigError, UctConfig};

/// Standard locations to search for the engine config.
pub const CONFIG_SEARCH_PATHS: &[&str] = &["uct.toml", "config.toml"];

/// Load the engine configuration.
///
/// Searches in the following order:
/// 1. Path specified by the `GOUCT_CONFIG` environment variable
/// 2. `uct.toml` / `config.toml` in the current directory
///
/// A missing file falls back to built-in defaults; a malformed file is a
/// fatal error. Environment overrides are applied last.
pub fn load_config() -> Result<UctConfig, ConfigError> {
    if let Ok(path) = std::env::var("GOUCT_CONFIG") {
        info!("loading config from GOUCT_CONFIG: {}", path);
        return load_from_path(Path::new(&path));
    }

    for path in CONFIG_SEARCH_PATHS {
        let path = Path::new(path);
        if path.exists() {
            info!("loading config from {}", path.display());
            return load_from_path(path);
        }
    }

    debug!("no config file found, using built-in defaults");
    let config = apply_env_overrides(UctConfig::default());
    config.validate()?;
    Ok(config)
}

/// Load configuration from a specific path.
pub fn load_from_path(path: &Path) -> Result<UctConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: UctConfig = toml::from_str(&content)?;
    let config = apply_env_overrides(config);
    config.validate()?;
    Ok(config)
}

/// Macro to reduce env override boilerplate.
macro_rules! env_override {
    ($config:expr, $field:ident, $key:expr, parse) => {
        if let Ok(v) =
            std::env::var($key).and_then(|s| s.parse().map_err(|_| std::env::VarError::NotPresent))
        {
            $config.$field = v;
        }
    };
    ($config:expr, $field:ident, $key:expr, optional_parse) => {
        if let Ok(v) =
            std::env::var($key).and_then(|s| s.parse().map_err(|_| std::env::VarError::NotPresent))
        {
            $config.$field = Some(v);
        }
    };
}

/// Apply environment variable overrides to a configuration.
///
/// Environment variables follow the pattern `GOUCT_<KEY>`.
pub fn apply_env_overrides(mut config: UctConfig) -> UctConfig {
    env_override!(config, threads, "GOUCT_THREADS", parse);
    env_override!(config, max_tree_size, "GOUCT_MAX_TREE_SIZE", parse);
    env_override!(config, pondering, "GOUCT_PONDERING", parse);
    env_override!(config, no_book, "GOUCT_NO_BOOK", parse);
    env_override!(config, force_seed, "GOUCT_FORCE_SEED", optional_parse);

    if let Ok(v) = std::env::var("GOUCT_THREAD_MODEL") {
        match v.to_ascii_lowercase().as_str() {
            "root" => config.thread_model = crate::ThreadModel::Root,
            "tree" => config.thread_model = crate::ThreadModel::Tree,
            "treevl" => config.thread_model = crate::ThreadModel::TreeVl,
            other => warn!("GOUCT_THREAD_MODEL={} not recognized, keeping default", other),
        }
    }

    config
}
