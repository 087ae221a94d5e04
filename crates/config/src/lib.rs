//! Configuration loading, validation, and env substitution.
//!
//! Config files: `lightning.toml`, `lightning.yaml`, or `lightning.json`
//! Searched in `./` then `~/.config/lightning/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{
        clear_config_dir, clear_data_dir, config_dir, data_dir, database_path, discover_and_load,
        find_or_default_config_path, load_config, set_config_dir, set_data_dir,
    },
    schema::{BridgeChannel, BridgeSet, ContentConfig, DatabaseConfig, LightningConfig},
    validate::{Diagnostic, Severity, ValidationResult},
};
