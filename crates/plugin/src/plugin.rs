use {
    async_trait::async_trait,
    lightning_common::{DeletedMessage, Message},
    serde::{Deserialize, Serialize},
};

use crate::error::Result;

/// Protocol version this core speaks. Plugins must list it in [`Plugin::support`].
pub const PROTOCOL_VERSION: &str = "0.7";

// ── Bridge descriptors ──────────────────────────────────────────────────────

/// Answer to "is this message part of a bridge?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeStatus {
    /// The message is an origin or mirrored copy tracked by the bridge.
    Bridged,
    /// The message is known to be outside any bridge.
    NotBridged,
    /// The platform cannot tell; the core must consult its store.
    Unknown,
}

/// Where a bridged operation should land on one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeTarget {
    /// Plugin name of the target platform.
    pub platform: String,
    /// Channel identifier on the target platform.
    pub channel: String,
    /// Opaque descriptor returned by [`Plugin::create_bridge`] for this channel.
    #[serde(default)]
    pub data: serde_json::Value,
    /// Mirrored message id on this platform. Set for edits and deletes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Id (on this platform) of the message being replied to, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

impl BridgeTarget {
    pub fn new(
        platform: impl Into<String>,
        channel: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            platform: platform.into(),
            channel: channel.into(),
            data,
            id: None,
            reply_to: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_reply_to(mut self, reply_to: Option<String>) -> Self {
        self.reply_to = reply_to;
        self
    }
}

/// Outcome of a successful bridged operation on one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgePlatform {
    pub platform: String,
    /// Message id the platform assigned (or kept) for the mirrored copy.
    pub id: String,
}

impl BridgePlatform {
    pub fn new(platform: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            id: id.into(),
        }
    }
}

// ── Plugin trait ────────────────────────────────────────────────────────────

/// Capability contract every platform adapter implements.
///
/// Adapters receive activity from their platform and report it through a
/// [`crate::PluginHandle`]; the core calls back into these methods to mirror
/// messages elsewhere.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique plugin name, e.g. `"bolt-discord"`. Used as the platform tag.
    fn name(&self) -> &str;

    /// Adapter version, informational only.
    fn version(&self) -> &str;

    /// Core protocol versions this adapter can talk to.
    fn support(&self) -> &[&str];

    /// Prepare `channel` for bridging and return an opaque descriptor
    /// (webhook handle, room alias, ...) the core passes back on delivery.
    async fn create_bridge(&self, channel: &str) -> Result<serde_json::Value>;

    /// Whether `message` belongs to a bridge, as far as the platform knows.
    async fn is_bridged(&self, message: &DeletedMessage) -> BridgeStatus {
        let _ = message;
        BridgeStatus::Unknown
    }

    /// Deliver a new mirrored copy of `message`.
    async fn create_message(
        &self,
        message: &Message,
        target: &BridgeTarget,
    ) -> Result<BridgePlatform>;

    /// Replace the mirrored copy `target.id` with the new contents.
    async fn edit_message(&self, message: &Message, target: &BridgeTarget)
    -> Result<BridgePlatform>;

    /// Remove the mirrored copy `target.id`.
    async fn delete_message(
        &self,
        message: &DeletedMessage,
        target: &BridgeTarget,
    ) -> Result<BridgePlatform>;
}
