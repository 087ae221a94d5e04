//! Generic intermediate representation of a chat message.
//!
//! Platform adapters convert their native events into these types before
//! handing them to the bridge; the bridge never inspects native payloads
//! beyond the opaque [`PlatformRef::native`] value.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Identifies the message that triggered bridging: `(platform, message id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OriginKey {
    pub platform: String,
    pub id: String,
}

impl OriginKey {
    pub fn new(platform: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for OriginKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform, self.id)
    }
}

impl FromStr for OriginKey {
    type Err = Error;

    /// Parses `<platform>:<id>`. Message ids may themselves contain `:`,
    /// platform names may not.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((platform, id)) if !platform.is_empty() && !id.is_empty() => {
                Ok(Self::new(platform, id))
            },
            _ => Err(Error::invalid_origin_key(s)),
        }
    }
}

/// Who sent a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    /// Name shown to readers (nickname, global name, ...).
    pub username: String,
    /// Raw account name on the origin platform.
    pub rawname: String,
    /// Stable account id on the origin platform.
    pub id: String,
    /// Avatar URL, if the platform exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    /// Accent colour used by adapters that render author badges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// A rich embed. Adapters map their native embed shape onto this.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub color: Option<u32>,
    pub image: Option<String>,
    pub thumbnail: Option<String>,
    pub footer: Option<String>,
    /// Epoch milliseconds.
    pub timestamp: Option<i64>,
    pub fields: Vec<EmbedField>,
}

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Where the file can be fetched from.
    pub file: String,
    /// Size in megabytes.
    pub size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// Declared encoding of a sticker asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StickerFormat {
    Png,
    Apng,
    Lottie,
    Gif,
}

impl StickerFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Apng => "apng",
            Self::Lottie => "lottie",
            Self::Gif => "gif",
        }
    }
}

/// An ephemeral asset that must be resolved to a concrete URL before it can
/// be mirrored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sticker {
    pub id: String,
    pub name: String,
    pub format: StickerFormat,
    /// URL prefix the asset lives under, e.g. `https://media.example.net/stickers`.
    pub base_url: String,
}

impl Sticker {
    /// Concrete asset URL: `<base_url>/<id>.<ext>`.
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "{}/{}.{}",
            self.base_url.trim_end_matches('/'),
            self.id,
            self.format.extension()
        )
    }

    #[must_use]
    pub fn filename(&self) -> String {
        format!("{}.{}", self.name, self.format.extension())
    }
}

/// Origin platform metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformRef {
    /// Plugin name, e.g. `bolt-discord`.
    pub name: String,
    /// Opaque native message reference, owned by the adapter.
    #[serde(default)]
    pub native: serde_json::Value,
}

/// What sort of message this is, as far as content derivation cares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Default,
    /// Deferred placeholder whose content is not available yet.
    Loading,
    /// System notice that a member joined.
    MemberJoined,
}

/// One chat message in platform-neutral form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel: String,
    pub author: Author,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stickers: Vec<Sticker>,
    #[serde(default)]
    pub kind: MessageKind,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub platform: PlatformRef,
    /// Id of the message this one replies to, on the same platform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

impl Message {
    #[must_use]
    pub fn origin_key(&self) -> OriginKey {
        OriginKey::new(&self.platform.name, &self.id)
    }

    /// The reduced projection used by delete handling and `is_bridged`.
    #[must_use]
    pub fn to_deleted(&self) -> DeletedMessage {
        DeletedMessage {
            id: self.id.clone(),
            channel: self.channel.clone(),
            platform: self.platform.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// Just enough of a message to locate its bridge entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletedMessage {
    pub id: String,
    pub channel: String,
    pub platform: PlatformRef,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl DeletedMessage {
    #[must_use]
    pub fn origin_key(&self) -> OriginKey {
        OriginKey::new(&self.platform.name, &self.id)
    }
}
