//! The `Lightning` runtime: owns the registry, the orchestrator and the
//! plugin event loop.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    lightning_common::{DeletedMessage, Message},
    lightning_config::LightningConfig,
    lightning_plugin::{
        Plugin, PluginEnvelope, PluginEvent, PluginEventReceiver, PluginHandle, PluginRegistry,
        event_channel,
    },
    lightning_store::{BridgeEntryStore, SqliteBridgeStore},
    tokio::{
        sync::{broadcast, mpsc},
        task::JoinSet,
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    channels::BridgeChannels,
    content::{AssetProbe, HttpProbe},
    error::{Error, Result},
    orchestrator::BridgeOrchestrator,
    report::BridgeReport,
};

const CORE_EVENT_CAPACITY: usize = 256;

/// What the core publishes to its subscribers.
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// Every registered plugin has reported ready. Sent once.
    Ready,
    Created(Message),
    Edited(Message),
    Deleted(DeletedMessage),
    /// Result of a fan-out triggered by one of the events above.
    Bridged(BridgeReport),
}

pub struct LightningBuilder {
    config: LightningConfig,
    plugins: Vec<Arc<dyn Plugin>>,
    store: Option<Arc<dyn BridgeEntryStore>>,
    probe: Option<Arc<dyn AssetProbe>>,
}

impl LightningBuilder {
    #[must_use]
    pub fn plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Use `store` instead of the SQLite database from config.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn BridgeEntryStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use `probe` for sticker reachability instead of HTTP `HEAD` requests.
    #[must_use]
    pub fn probe(mut self, probe: Arc<dyn AssetProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Register plugins, open the store and wire every bridged channel.
    pub async fn build(self) -> Result<Lightning> {
        let mut registry = PluginRegistry::new();
        for plugin in self.plugins {
            registry.register(plugin)?;
        }
        let registry = Arc::new(registry);

        let store = match self.store {
            Some(store) => store,
            None => {
                let path = lightning_config::database_path(&self.config);
                info!(path = %path.display(), "opening bridge database");
                Arc::new(SqliteBridgeStore::open(&path).await?) as Arc<dyn BridgeEntryStore>
            },
        };

        let probe = self.probe.unwrap_or_else(|| {
            Arc::new(HttpProbe::new(Duration::from_secs(
                self.config.content.sticker_probe_timeout_secs,
            ))) as Arc<dyn AssetProbe>
        });

        let mut channels = BridgeChannels::from_config(&self.config.bridges);
        channels.wire(&registry).await;

        let orchestrator = Arc::new(BridgeOrchestrator::new(
            Arc::clone(&registry),
            store,
            channels,
            self.config.content,
            probe,
        ));

        let (events_tx, events_rx) = event_channel();
        let (core_tx, _) = broadcast::channel(CORE_EVENT_CAPACITY);
        Ok(Lightning {
            orchestrator,
            registry,
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            core_tx,
            cancel: CancellationToken::new(),
        })
    }
}

/// A configured bridge core.
pub struct Lightning {
    orchestrator: Arc<BridgeOrchestrator>,
    registry: Arc<PluginRegistry>,
    events_tx: mpsc::UnboundedSender<PluginEnvelope>,
    events_rx: Mutex<Option<PluginEventReceiver>>,
    core_tx: broadcast::Sender<CoreEvent>,
    cancel: CancellationToken,
}

impl Lightning {
    pub fn builder(config: LightningConfig) -> LightningBuilder {
        LightningBuilder {
            config,
            plugins: Vec::new(),
            store: None,
            probe: None,
        }
    }

    /// Event handle for a registered plugin.
    pub fn handle(&self, plugin: &str) -> Result<PluginHandle> {
        self.registry.by_name(plugin)?;
        Ok(PluginHandle::new(plugin, self.events_tx.clone()))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.core_tx.subscribe()
    }

    pub fn orchestrator(&self) -> &Arc<BridgeOrchestrator> {
        &self.orchestrator
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Token that stops [`Lightning::run`] when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drain plugin events until shutdown, one task per event.
    ///
    /// In-flight events finish before this returns.
    pub async fn run(&self) -> Result<()> {
        let mut events = self
            .events_rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or(Error::AlreadyRunning)?;
        let mut tasks = JoinSet::new();
        info!(plugins = self.registry.len(), "bridge event loop started");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "event task panicked");
                    }
                },
                envelope = events.recv() => {
                    let Some(envelope) = envelope else { break };
                    self.dispatch(envelope, &mut tasks);
                },
            }
        }

        // Handles fail with `Closed` from here on.
        events.close();
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "event task panicked");
            }
        }
        info!("bridge event loop stopped");
        Ok(())
    }

    fn publish(&self, event: CoreEvent) {
        // No subscribers is fine.
        let _ = self.core_tx.send(event);
    }

    fn dispatch(&self, envelope: PluginEnvelope, tasks: &mut JoinSet<()>) {
        let PluginEnvelope { plugin, event } = envelope;
        debug!(plugin = %plugin, event = event.kind(), "plugin event");

        if let PluginEvent::Ready = event {
            match self.registry.signal_ready(&plugin) {
                Ok(true) => self.publish(CoreEvent::Ready),
                Ok(false) => {},
                Err(e) => warn!(plugin = %plugin, error = %e, "ready from unknown plugin"),
            }
            return;
        }

        let orchestrator = Arc::clone(&self.orchestrator);
        let core_tx = self.core_tx.clone();
        tasks.spawn(async move {
            let handled = match event {
                PluginEvent::CreateMessage(message) => {
                    let _ = core_tx.send(CoreEvent::Created(message.clone()));
                    orchestrator.handle_create(&message).await.map(Some)
                },
                PluginEvent::CreateNonbridgedMessage(message) => {
                    orchestrator.handle_create(&message).await.map(|_| None)
                },
                PluginEvent::EditMessage(message) => {
                    let _ = core_tx.send(CoreEvent::Edited(message.clone()));
                    orchestrator.handle_edit(&message).await.map(Some)
                },
                PluginEvent::DeleteMessage(message) => {
                    let _ = core_tx.send(CoreEvent::Deleted(message.clone()));
                    orchestrator.handle_delete(&message).await.map(Some)
                },
                PluginEvent::Ready => Ok(None),
            };
            match handled {
                Ok(Some(report)) if !report.is_empty() => {
                    let _ = core_tx.send(CoreEvent::Bridged(report));
                },
                Ok(_) => {},
                Err(e) => warn!(plugin = %plugin, error = %e, "failed to handle plugin event"),
            }
        });
    }
}
