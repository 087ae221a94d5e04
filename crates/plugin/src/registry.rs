use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use {tokio::sync::watch, tracing::info};

use crate::{
    error::{Error, Result},
    plugin::{PROTOCOL_VERSION, Plugin},
};

/// Registry of all loaded platform plugins.
///
/// Registration happens before the runtime starts (it needs `&mut self`);
/// after that the registry is shared read-only, apart from the readiness
/// barrier which tracks which plugins have reported [`crate::PluginEvent::Ready`].
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
    index: HashMap<String, usize>,
    ready: Mutex<HashSet<String>>,
    all_ready: watch::Sender<bool>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
            index: HashMap::new(),
            ready: Mutex::new(HashSet::new()),
            all_ready: watch::Sender::new(false),
        }
    }

    /// Add a plugin. Names are unique and the plugin must speak
    /// [`PROTOCOL_VERSION`].
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<()> {
        let name = plugin.name().to_string();
        if self.index.contains_key(&name) {
            return Err(Error::duplicate_plugin(name));
        }
        if !plugin.support().contains(&PROTOCOL_VERSION) {
            return Err(Error::UnsupportedVersion {
                name,
                required: PROTOCOL_VERSION.to_string(),
                supported: plugin.support().iter().map(|v| v.to_string()).collect(),
            });
        }
        info!(plugin = %name, version = plugin.version(), "registered plugin");
        self.index.insert(name, self.plugins.len());
        self.plugins.push(plugin);
        Ok(())
    }

    /// All plugins in registration order. Each call starts a fresh pass.
    pub fn all(&self) -> std::slice::Iter<'_, Arc<dyn Plugin>> {
        self.plugins.iter()
    }

    pub fn by_name(&self, name: &str) -> Result<&Arc<dyn Plugin>> {
        self.index
            .get(name)
            .map(|&i| &self.plugins[i])
            .ok_or_else(|| Error::plugin_not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Record that `name` is ready. Returns `true` exactly once: on the call
    /// that completes the set of registered plugins.
    pub fn signal_ready(&self, name: &str) -> Result<bool> {
        if !self.contains(name) {
            return Err(Error::plugin_not_found(name));
        }
        let mut ready = self.ready.lock().unwrap_or_else(|e| e.into_inner());
        if !ready.insert(name.to_string()) || ready.len() < self.plugins.len() {
            return Ok(false);
        }
        if *self.all_ready.borrow() {
            return Ok(false);
        }
        self.all_ready.send_replace(true);
        info!(plugins = self.plugins.len(), "all plugins ready");
        Ok(true)
    }

    pub fn is_ready(&self) -> bool {
        self.plugins.is_empty() || *self.all_ready.borrow()
    }

    /// Resolve once every registered plugin has signalled readiness.
    pub async fn wait_ready(&self) {
        if self.plugins.is_empty() {
            return;
        }
        let mut rx = self.all_ready.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}
