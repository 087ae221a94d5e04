//! Create, edit and delete fan-out across bridged platforms.

use std::sync::Arc;

use {
    dashmap::DashSet,
    futures::future::join_all,
    lightning_common::{DeletedMessage, Message, OriginKey},
    lightning_config::{BridgeChannel, ContentConfig},
    lightning_plugin::{BridgeStatus, Plugin, PluginRegistry},
    lightning_store::{BridgeEntry, BridgeEntryStore},
    tracing::{debug, info, warn},
};

use crate::{
    channels::BridgeChannels,
    content::{self, AssetProbe},
    error::Result,
    locks::KeyedLocks,
    report::{BridgeAction, BridgeReport, SkipReason, TargetOutcome, TargetResult},
};

pub struct BridgeOrchestrator {
    registry: Arc<PluginRegistry>,
    store: Arc<dyn BridgeEntryStore>,
    channels: BridgeChannels,
    content: ContentConfig,
    probe: Arc<dyn AssetProbe>,
    locks: KeyedLocks<OriginKey>,
    /// Copies written during an in-flight create, until the store has them.
    echoes: DashSet<(String, String)>,
}

impl BridgeOrchestrator {
    pub fn new(
        registry: Arc<PluginRegistry>,
        store: Arc<dyn BridgeEntryStore>,
        channels: BridgeChannels,
        content: ContentConfig,
        probe: Arc<dyn AssetProbe>,
    ) -> Self {
        Self {
            registry,
            store,
            channels,
            content,
            probe,
            locks: KeyedLocks::new(),
            echoes: DashSet::new(),
        }
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn BridgeEntryStore> {
        &self.store
    }

    pub fn channels(&self) -> &BridgeChannels {
        &self.channels
    }

    /// Whether `(platform, id)` is a copy this orchestrator wrote.
    async fn is_own_copy(&self, platform: &str, id: &str) -> Result<bool> {
        if self.echoes.contains(&(platform.to_string(), id.to_string())) {
            return Ok(true);
        }
        Ok(self.store.find_by_remote(platform, id).await?.is_some())
    }

    /// Entry for the message `reply_to` points at, on `platform`. The target
    /// may be an origin message or one of our copies.
    async fn reply_entry(&self, platform: &str, reply_to: &str) -> Option<BridgeEntry> {
        let key = OriginKey::new(platform, reply_to);
        let found = match self.store.get(&key).await {
            Ok(Some(entry)) => Ok(Some(entry)),
            Ok(None) => self.store.find_by_remote(platform, reply_to).await,
            Err(e) => Err(e),
        };
        match found {
            Ok(entry) => entry,
            Err(e) => {
                warn!(platform, reply_to, error = %e, "reply lookup failed, bridging without reply");
                None
            },
        }
    }

    fn plugin_for(&self, channel: &BridgeChannel) -> std::result::Result<&Arc<dyn Plugin>, TargetOutcome> {
        self.registry.by_name(&channel.platform).map_err(|_| {
            debug!(platform = %channel.platform, "skipping target without plugin");
            TargetOutcome::new(&channel.platform, &channel.channel, TargetResult::Skipped {
                reason: SkipReason::NotRegistered,
            })
        })
    }

    /// Mirror a new message onto every channel bridged with its own.
    pub async fn handle_create(&self, message: &Message) -> Result<BridgeReport> {
        let key = message.origin_key();
        let mut report = BridgeReport::new(key.clone(), BridgeAction::Create);

        if self.is_own_copy(&key.platform, &key.id).await? {
            debug!(platform = %key.platform, id = %key.id, "ignoring echo of bridged copy");
            return Ok(report);
        }
        if let Ok(origin) = self.registry.by_name(&key.platform)
            && origin.is_bridged(&message.to_deleted()).await == BridgeStatus::Bridged
        {
            debug!(platform = %key.platform, id = %key.id, "origin plugin marked message as bridged");
            return Ok(report);
        }

        let targets = self.channels.targets(&key.platform, &message.channel);
        if targets.is_empty() {
            return Ok(report);
        }

        let _guard = self.locks.lock(key.clone()).await;
        let existing = self.store.get(&key).await?;
        let outgoing = content::derive(message, &self.content, self.probe.as_ref()).await;
        let reply = match &message.reply_to {
            Some(reply_to) => self.reply_entry(&key.platform, reply_to).await,
            None => None,
        };
        let probe_message = message.to_deleted();

        let deliveries = targets.into_iter().map(|channel| {
            let existing = existing.as_ref();
            let reply = reply.as_ref();
            let outgoing = &outgoing;
            let probe_message = &probe_message;
            let key = &key;
            async move {
                let plugin = match self.plugin_for(channel) {
                    Ok(plugin) => plugin,
                    Err(skipped) => return skipped,
                };
                let skip = match plugin.is_bridged(probe_message).await {
                    BridgeStatus::Bridged => true,
                    BridgeStatus::NotBridged => false,
                    BridgeStatus::Unknown => {
                        existing.is_some_and(|e| e.remote(&channel.platform).is_some())
                    },
                };
                if skip {
                    debug!(platform = %channel.platform, origin_id = %key.id, "already bridged");
                    return TargetOutcome::new(
                        &channel.platform,
                        &channel.channel,
                        TargetResult::Skipped {
                            reason: SkipReason::AlreadyBridged,
                        },
                    );
                }

                let reply_to = reply
                    .and_then(|entry| entry.id_on(&channel.platform))
                    .map(str::to_string);
                let target = self.channels.bridge_target(channel).with_reply_to(reply_to);
                let result = match plugin.create_message(outgoing, &target).await {
                    Ok(created) if created.id.is_empty() => TargetResult::Failed {
                        error: "platform returned an empty message id".to_string(),
                    },
                    Ok(created) => {
                        self.echoes
                            .insert((channel.platform.clone(), created.id.clone()));
                        TargetResult::Delivered {
                            remote_id: created.id,
                        }
                    },
                    Err(e) => TargetResult::Failed {
                        error: e.to_string(),
                    },
                };
                TargetOutcome::new(&channel.platform, &channel.channel, result)
            }
        });
        report.outcomes = join_all(deliveries).await;

        // A copy stays in the echo set until the store knows about it.
        for outcome in &mut report.outcomes {
            let remote_id = match &outcome.result {
                TargetResult::Delivered { remote_id } => remote_id.clone(),
                _ => continue,
            };
            let echo = (outcome.platform.clone(), remote_id.clone());
            match self.store.upsert(&key, &outcome.platform, &remote_id).await {
                Ok(()) => {
                    self.echoes.remove(&echo);
                },
                Err(e) => {
                    warn!(
                        platform = %outcome.platform,
                        origin_id = %key.id,
                        remote_id = %remote_id,
                        error = %e,
                        "delivered copy could not be recorded"
                    );
                    outcome.result = TargetResult::Failed {
                        error: format!("delivered as {remote_id} but not recorded: {e}"),
                    };
                },
            }
        }

        self.log_report(&report);
        Ok(report)
    }

    /// Propagate an edit to every platform recorded in the entry.
    pub async fn handle_edit(&self, message: &Message) -> Result<BridgeReport> {
        let key = message.origin_key();
        let mut report = BridgeReport::new(key.clone(), BridgeAction::Edit);

        let _guard = self.locks.lock(key.clone()).await;
        let Some(entry) = self.store.get(&key).await? else {
            debug!(platform = %key.platform, id = %key.id, "edit of unbridged message");
            return Ok(report);
        };
        let outgoing = content::derive(message, &self.content, self.probe.as_ref()).await;
        let reply = match &message.reply_to {
            Some(reply_to) => self.reply_entry(&key.platform, reply_to).await,
            None => None,
        };

        let edits = entry.remotes.iter().map(|(platform, remote_id)| {
            let outgoing = &outgoing;
            let reply = reply.as_ref();
            let key = &key;
            async move {
                let Some(channel) = self.channels.target_on(&key.platform, &message.channel, platform)
                else {
                    return not_configured(platform);
                };
                let plugin = match self.plugin_for(channel) {
                    Ok(plugin) => plugin,
                    Err(skipped) => return skipped,
                };
                let reply_to = reply
                    .and_then(|entry| entry.id_on(platform))
                    .map(str::to_string);
                let target = self
                    .channels
                    .bridge_target(channel)
                    .with_id(remote_id)
                    .with_reply_to(reply_to);
                let result = match plugin.edit_message(outgoing, &target).await {
                    Ok(edited) => TargetResult::Delivered {
                        remote_id: edited.id,
                    },
                    Err(e) => TargetResult::Failed {
                        error: e.to_string(),
                    },
                };
                TargetOutcome::new(platform, &channel.channel, result)
            }
        });
        report.outcomes = join_all(edits).await;

        self.log_report(&report);
        Ok(report)
    }

    /// Delete every copy, then forget the entry whatever the outcome.
    pub async fn handle_delete(&self, message: &DeletedMessage) -> Result<BridgeReport> {
        let key = message.origin_key();
        let mut report = BridgeReport::new(key.clone(), BridgeAction::Delete);

        let _guard = self.locks.lock(key.clone()).await;
        let Some(entry) = self.store.get(&key).await? else {
            debug!(platform = %key.platform, id = %key.id, "delete of unbridged message");
            return Ok(report);
        };

        let deletes = entry.remotes.iter().map(|(platform, remote_id)| {
            let key = &key;
            async move {
                let Some(channel) = self.channels.target_on(&key.platform, &message.channel, platform)
                else {
                    return not_configured(platform);
                };
                let plugin = match self.plugin_for(channel) {
                    Ok(plugin) => plugin,
                    Err(skipped) => return skipped,
                };
                let target = self.channels.bridge_target(channel).with_id(remote_id);
                let result = match plugin.delete_message(message, &target).await {
                    Ok(deleted) => TargetResult::Delivered {
                        remote_id: deleted.id,
                    },
                    Err(e) => TargetResult::Failed {
                        error: e.to_string(),
                    },
                };
                TargetOutcome::new(platform, &channel.channel, result)
            }
        });
        report.outcomes = join_all(deletes).await;

        self.store.delete(&key).await?;
        self.log_report(&report);
        Ok(report)
    }

    fn log_report(&self, report: &BridgeReport) {
        for outcome in &report.outcomes {
            match &outcome.result {
                TargetResult::Delivered { remote_id } => {
                    debug!(
                        action = report.action.as_str(),
                        platform = %outcome.platform,
                        channel = %outcome.channel,
                        origin_id = %report.origin.id,
                        remote_id = %remote_id,
                        "bridged"
                    );
                },
                TargetResult::Skipped { reason } => {
                    debug!(
                        action = report.action.as_str(),
                        platform = %outcome.platform,
                        reason = ?reason,
                        "target skipped"
                    );
                },
                TargetResult::Failed { error } => {
                    warn!(
                        action = report.action.as_str(),
                        platform = %outcome.platform,
                        channel = %outcome.channel,
                        origin_id = %report.origin.id,
                        error = %error,
                        "bridge delivery failed"
                    );
                },
            }
        }
        crate::metrics::record(report);
        if !report.is_empty() {
            info!(
                action = report.action.as_str(),
                origin = %report.origin,
                targets = report.outcomes.len(),
                delivered = report.delivered().count(),
                failed = report.failures().count(),
                "bridge operation finished"
            );
        }
    }
}

fn not_configured(platform: &str) -> TargetOutcome {
    debug!(platform, "platform no longer bridged with origin channel");
    TargetOutcome::new(platform, "", TargetResult::Skipped {
        reason: SkipReason::NotConfigured,
    })
}
