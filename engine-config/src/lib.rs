//! Configuration record for the UCT search core.
//!
//! The core never parses anything itself: it receives a fully populated
//! [`UctConfig`]. This crate owns the record, its defaults, TOML loading
//! and the validation of mutually exclusive options.
//!
//! # Configuration Priority
//!
//! Settings are loaded with the following priority (highest to lowest):
//! 1. Environment variables (`GOUCT_<KEY>`)
//! 2. uct.toml file
//! 3. Built-in defaults

pub mod defaults;
mod loader;
mod structs;

pub use defaults::*;
pub use loader::{apply_env_overrides, load_config, load_from_path, CONFIG_SEARCH_PATHS};
pub use structs::{
    ConfigError, DynkomiMask, PolicyConfig, PolicyKind, ThreadModel, UctConfig,
};
