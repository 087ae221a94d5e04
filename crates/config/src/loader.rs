use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::LightningConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "lightning.toml",
    "lightning.yaml",
    "lightning.yml",
    "lightning.json",
];

/// Default SQLite file name inside the data directory.
const DATABASE_FILENAME: &str = "lightning.db";

static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);
static DATA_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Override the user-global config directory (e.g. from `--config-dir`).
pub fn set_config_dir(dir: PathBuf) {
    *CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner()) = Some(dir);
}

pub fn clear_config_dir() {
    *CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner()) = None;
}

/// Override the data directory (e.g. from `--data-dir`).
pub fn set_data_dir(dir: PathBuf) {
    *DATA_DIR_OVERRIDE.lock().unwrap_or_else(|e| e.into_inner()) = Some(dir);
}

pub fn clear_data_dir() {
    *DATA_DIR_OVERRIDE.lock().unwrap_or_else(|e| e.into_inner()) = None;
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<LightningConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./lightning.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/lightning/lightning.{toml,yaml,yml,json}` (user-global)
///
/// Returns `LightningConfig::default()` if no config file is found.
pub fn discover_and_load() -> LightningConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    LightningConfig::default()
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(PathBuf::from)
        .chain(config_dir().into_iter().flat_map(|dir| {
            CONFIG_FILENAMES
                .iter()
                .map(move |name| dir.join(name))
        }))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/lightning/`), or the
/// override set with [`set_config_dir`].
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
    {
        return Some(dir);
    }
    directories::ProjectDirs::from("", "", "lightning").map(|d| d.config_dir().to_path_buf())
}

/// Returns the data directory used for the database and migration dumps.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = DATA_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
    {
        return dir;
    }
    directories::ProjectDirs::from("", "", "lightning")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".lightning"))
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lightning.toml")
}

/// Resolve the SQLite database path from config, falling back to the data dir.
pub fn database_path(config: &LightningConfig) -> PathBuf {
    config
        .database
        .path
        .clone()
        .unwrap_or_else(|| data_dir().join(DATABASE_FILENAME))
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<LightningConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
