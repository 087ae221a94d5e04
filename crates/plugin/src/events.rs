//! Plugin → core event stream.
//!
//! Adapters get a [`PluginHandle`] stamped with their plugin name. Everything
//! they emit flows through one unbounded channel the core drains.

use {
    lightning_common::{DeletedMessage, Message},
    tokio::sync::mpsc,
};

use crate::error::{Error, Result};

/// Activity reported by a platform adapter.
#[derive(Debug, Clone)]
pub enum PluginEvent {
    /// A new message that should be mirrored.
    CreateMessage(Message),
    /// A message that goes through the create flow but is not published to
    /// core subscribers.
    CreateNonbridgedMessage(Message),
    EditMessage(Message),
    DeleteMessage(DeletedMessage),
    /// The adapter finished connecting.
    Ready,
}

impl PluginEvent {
    /// Short label for logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateMessage(_) => "create_message",
            Self::CreateNonbridgedMessage(_) => "create_nonbridged_message",
            Self::EditMessage(_) => "edit_message",
            Self::DeleteMessage(_) => "delete_message",
            Self::Ready => "ready",
        }
    }
}

/// An event tagged with the plugin that produced it.
#[derive(Debug, Clone)]
pub struct PluginEnvelope {
    pub plugin: String,
    pub event: PluginEvent,
}

pub type PluginEventReceiver = mpsc::UnboundedReceiver<PluginEnvelope>;

/// Create the shared event channel. The core keeps the receiver and mints
/// one [`PluginHandle`] per plugin from the sender.
pub fn event_channel() -> (mpsc::UnboundedSender<PluginEnvelope>, PluginEventReceiver) {
    mpsc::unbounded_channel()
}

/// Per-plugin sender adapters use to report activity.
#[derive(Debug, Clone)]
pub struct PluginHandle {
    plugin: String,
    tx: mpsc::UnboundedSender<PluginEnvelope>,
}

impl PluginHandle {
    pub fn new(plugin: impl Into<String>, tx: mpsc::UnboundedSender<PluginEnvelope>) -> Self {
        Self {
            plugin: plugin.into(),
            tx,
        }
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Send an event to the core. Fails once the core has shut down.
    pub fn emit(&self, event: PluginEvent) -> Result<()> {
        self.tx
            .send(PluginEnvelope {
                plugin: self.plugin.clone(),
                event,
            })
            .map_err(|_| Error::Closed)
    }

    pub fn create_message(&self, message: Message) -> Result<()> {
        self.emit(PluginEvent::CreateMessage(message))
    }

    pub fn create_nonbridged_message(&self, message: Message) -> Result<()> {
        self.emit(PluginEvent::CreateNonbridgedMessage(message))
    }

    pub fn edit_message(&self, message: Message) -> Result<()> {
        self.emit(PluginEvent::EditMessage(message))
    }

    pub fn delete_message(&self, message: DeletedMessage) -> Result<()> {
        self.emit(PluginEvent::DeleteMessage(message))
    }

    pub fn ready(&self) -> Result<()> {
        self.emit(PluginEvent::Ready)
    }
}
