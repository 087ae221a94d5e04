//! Which channels mirror which, and the descriptors plugins handed back
//! when each channel was wired up.

use std::collections::HashMap;

use {
    lightning_config::{BridgeChannel, BridgeSet},
    lightning_plugin::{BridgeTarget, PluginRegistry},
    tracing::{info, warn},
};

#[derive(Debug, Default)]
pub struct BridgeChannels {
    sets: Vec<Vec<BridgeChannel>>,
    descriptors: HashMap<BridgeChannel, serde_json::Value>,
}

impl BridgeChannels {
    pub fn from_config(sets: &[BridgeSet]) -> Self {
        let sets = sets
            .iter()
            .map(|set| {
                let mut channels: Vec<BridgeChannel> = Vec::with_capacity(set.channels.len());
                for channel in &set.channels {
                    if !channels.contains(channel) {
                        channels.push(channel.clone());
                    }
                }
                channels
            })
            .filter(|channels| channels.len() > 1)
            .collect();
        Self {
            sets,
            descriptors: HashMap::new(),
        }
    }

    /// Every distinct configured channel, in config order.
    pub fn channels(&self) -> Vec<&BridgeChannel> {
        let mut seen = Vec::new();
        for channel in self.sets.iter().flatten() {
            if !seen.contains(&channel) {
                seen.push(channel);
            }
        }
        seen
    }

    /// Call `create_bridge` once per configured channel and keep the
    /// descriptors. Channels whose platform has no plugin, or whose setup
    /// fails, are logged and keep a null descriptor.
    pub async fn wire(&mut self, registry: &PluginRegistry) -> usize {
        let mut wired = HashMap::new();
        for channel in self.channels() {
            let plugin = match registry.by_name(&channel.platform) {
                Ok(plugin) => plugin,
                Err(_) => {
                    warn!(
                        platform = %channel.platform,
                        channel = %channel.channel,
                        "no plugin registered for bridged channel"
                    );
                    continue;
                },
            };
            match plugin.create_bridge(&channel.channel).await {
                Ok(descriptor) => {
                    wired.insert(channel.clone(), descriptor);
                },
                Err(e) => {
                    warn!(
                        platform = %channel.platform,
                        channel = %channel.channel,
                        error = %e,
                        "failed to set up bridge channel"
                    );
                },
            }
        }
        let count = wired.len();
        self.descriptors.extend(wired);
        info!(channels = count, "bridge channels wired");
        count
    }

    pub fn descriptor(&self, channel: &BridgeChannel) -> serde_json::Value {
        self.descriptors
            .get(channel)
            .cloned()
            .unwrap_or(serde_json::Value::Null)
    }

    /// Channels on other platforms that mirror `(platform, channel)`.
    ///
    /// At most one channel per platform: remote ids are recorded per
    /// platform, so the first configured channel wins.
    pub fn targets(&self, platform: &str, channel: &str) -> Vec<&BridgeChannel> {
        let mut targets: Vec<&BridgeChannel> = Vec::new();
        for set in &self.sets {
            if !set
                .iter()
                .any(|c| c.platform == platform && c.channel == channel)
            {
                continue;
            }
            for candidate in set {
                if candidate.platform == platform {
                    continue;
                }
                match targets.iter().find(|t| t.platform == candidate.platform) {
                    Some(existing) if existing.channel != candidate.channel => {
                        warn!(
                            platform = %candidate.platform,
                            kept = %existing.channel,
                            ignored = %candidate.channel,
                            "channel bridged to the same platform twice"
                        );
                    },
                    Some(_) => {},
                    None => targets.push(candidate),
                }
            }
        }
        targets
    }

    /// The channel on `target_platform` that mirrors `(platform, channel)`.
    pub fn target_on(
        &self,
        platform: &str,
        channel: &str,
        target_platform: &str,
    ) -> Option<&BridgeChannel> {
        self.targets(platform, channel)
            .into_iter()
            .find(|t| t.platform == target_platform)
    }

    /// Delivery descriptor for one target channel.
    pub fn bridge_target(&self, channel: &BridgeChannel) -> BridgeTarget {
        BridgeTarget::new(&channel.platform, &channel.channel, self.descriptor(channel))
    }
}
