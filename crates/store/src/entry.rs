use std::collections::BTreeMap;

use {
    lightning_common::OriginKey,
    serde::{Deserialize, Serialize},
};

/// Where an origin message has been mirrored to.
///
/// Serializes as `{ origin_platform, origin_id, remotes: { <platform>: <id> } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeEntry {
    pub origin_platform: String,
    pub origin_id: String,
    #[serde(default)]
    pub remotes: BTreeMap<String, String>,
}

impl BridgeEntry {
    pub fn new(key: &OriginKey) -> Self {
        Self {
            origin_platform: key.platform.clone(),
            origin_id: key.id.clone(),
            remotes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn key(&self) -> OriginKey {
        OriginKey::new(&self.origin_platform, &self.origin_id)
    }

    /// Remote id on `platform`, if the message was bridged there.
    #[must_use]
    pub fn remote(&self, platform: &str) -> Option<&str> {
        self.remotes.get(platform).map(String::as_str)
    }

    /// Id of this message as seen on `platform`: the remote copy, or the
    /// origin message itself when `platform` is where it was sent.
    #[must_use]
    pub fn id_on(&self, platform: &str) -> Option<&str> {
        if platform == self.origin_platform {
            Some(self.origin_id.as_str())
        } else {
            self.remote(platform)
        }
    }
}
