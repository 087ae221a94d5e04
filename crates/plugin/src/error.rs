use std::error::Error as StdError;

/// Crate-wide result type for plugin operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed plugin errors shared by the registry and adapters.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A plugin with the same name is already registered.
    #[error("plugin already registered: {name}")]
    DuplicatePlugin { name: String },

    /// No plugin with this name is registered.
    #[error("unknown plugin: {name}")]
    PluginNotFound { name: String },

    /// The plugin does not declare support for the core protocol version.
    #[error("plugin {name} supports {supported:?}, core speaks {required}")]
    UnsupportedVersion {
        name: String,
        required: String,
        supported: Vec<String>,
    },

    /// The platform rejected or failed to deliver a bridged operation.
    #[error("delivery to {platform} failed: {reason}")]
    Delivery { platform: String, reason: String },

    /// The core is no longer accepting events (shut down).
    #[error("plugin event channel closed")]
    Closed,

    /// Wrapped source error from a platform client.
    #[error("plugin operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// JSON (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn duplicate_plugin(name: impl Into<String>) -> Self {
        Self::DuplicatePlugin { name: name.into() }
    }

    #[must_use]
    pub fn plugin_not_found(name: impl Into<String>) -> Self {
        Self::PluginNotFound { name: name.into() }
    }

    #[must_use]
    pub fn delivery(platform: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Delivery {
            platform: platform.into(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
