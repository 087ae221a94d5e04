//! Config schema types (database, bridges, content rules, plugin settings).
use std::{collections::HashMap, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LightningConfig {
    pub database: DatabaseConfig,
    /// Sets of channels mirrored together.
    pub bridges: Vec<BridgeSet>,
    pub content: ContentConfig,
    /// Per-plugin settings, handed to the adapter untouched.
    pub plugins: HashMap<String, serde_json::Value>,
}

impl LightningConfig {
    /// Settings for a single plugin, or `Value::Null` when none are configured.
    #[must_use]
    pub fn plugin_config(&self, name: &str) -> serde_json::Value {
        self.plugins
            .get(name)
            .cloned()
            .unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file. Defaults to `<data_dir>/lightning.db`.
    pub path: Option<PathBuf>,
}

/// One `(platform, channel)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BridgeChannel {
    pub platform: String,
    pub channel: String,
}

impl BridgeChannel {
    pub fn new(platform: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            channel: channel.into(),
        }
    }
}

/// Channels whose messages are mirrored onto each other.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSet {
    pub name: Option<String>,
    pub channels: Vec<BridgeChannel>,
}

/// Content derivation limits applied before fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Characters kept before truncating with an ellipsis.
    pub max_content_chars: usize,
    /// Attachments larger than this (in megabytes) are dropped.
    pub attachment_quota_mb: f64,
    /// Upper bound for each sticker reachability probe.
    pub sticker_probe_timeout_secs: u64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            max_content_chars: 2000,
            attachment_quota_mb: 25.0,
            sticker_probe_timeout_secs: 5,
        }
    }
}
