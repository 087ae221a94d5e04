//! End-to-end behaviour of the orchestrator and runtime against mock plugins.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    lightning_bridge::{
        AssetProbe, BridgeChannels, BridgeOrchestrator, CoreEvent, Lightning, SkipReason,
        TargetResult,
    },
    lightning_common::{Author, DeletedMessage, Message, MessageKind, OriginKey, PlatformRef},
    lightning_config::{BridgeChannel, BridgeSet, ContentConfig, LightningConfig},
    lightning_plugin::{
        BridgePlatform, BridgeStatus, BridgeTarget, Error as PluginError, Plugin, PluginRegistry,
    },
    lightning_store::{
        BridgeEntry, BridgeEntryStore, Error as StoreError, MemoryBridgeStore, SqliteBridgeStore,
    },
};

// ── Mocks ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Create {
        channel: String,
        content: Option<String>,
        reply_to: Option<String>,
    },
    Edit {
        id: String,
        content: Option<String>,
    },
    Delete {
        id: String,
    },
}

struct MockPlugin {
    name: String,
    status: Mutex<BridgeStatus>,
    fail: AtomicBool,
    empty_ids: AtomicBool,
    next_id: AtomicUsize,
    calls: Mutex<Vec<Call>>,
}

impl MockPlugin {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            status: Mutex::new(BridgeStatus::Unknown),
            fail: AtomicBool::new(false),
            empty_ids: AtomicBool::new(false),
            next_id: AtomicUsize::new(1),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing(name: &str) -> Arc<Self> {
        let plugin = Self::new(name);
        plugin.fail.store(true, Ordering::SeqCst);
        plugin
    }

    fn set_status(&self, status: BridgeStatus) {
        *self.status.lock().unwrap() = status;
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> Result<(), PluginError> {
        self.calls.lock().unwrap().push(call);
        if self.fail.load(Ordering::SeqCst) {
            return Err(PluginError::delivery(&self.name, "simulated outage"));
        }
        Ok(())
    }
}

#[async_trait]
impl Plugin for MockPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        "0.7.0"
    }

    fn support(&self) -> &[&str] {
        &["0.7"]
    }

    async fn create_bridge(&self, channel: &str) -> Result<serde_json::Value, PluginError> {
        Ok(serde_json::json!({ "webhook": format!("{}/{channel}", self.name) }))
    }

    async fn is_bridged(&self, _message: &DeletedMessage) -> BridgeStatus {
        *self.status.lock().unwrap()
    }

    async fn create_message(
        &self,
        message: &Message,
        target: &BridgeTarget,
    ) -> Result<BridgePlatform, PluginError> {
        self.record(Call::Create {
            channel: target.channel.clone(),
            content: message.content.clone(),
            reply_to: target.reply_to.clone(),
        })?;
        assert_eq!(target.data["webhook"], format!("{}/{}", self.name, target.channel));
        if self.empty_ids.load(Ordering::SeqCst) {
            return Ok(BridgePlatform::new(&self.name, ""));
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(BridgePlatform::new(&self.name, format!("{}-{n}", self.name)))
    }

    async fn edit_message(
        &self,
        message: &Message,
        target: &BridgeTarget,
    ) -> Result<BridgePlatform, PluginError> {
        let id = target.id.clone().unwrap_or_default();
        self.record(Call::Edit {
            id: id.clone(),
            content: message.content.clone(),
        })?;
        Ok(BridgePlatform::new(&self.name, id))
    }

    async fn delete_message(
        &self,
        _message: &DeletedMessage,
        target: &BridgeTarget,
    ) -> Result<BridgePlatform, PluginError> {
        let id = target.id.clone().unwrap_or_default();
        self.record(Call::Delete { id: id.clone() })?;
        Ok(BridgePlatform::new(&self.name, id))
    }
}

/// Memory store whose next `upsert` fails once.
struct FlakyStore {
    inner: MemoryBridgeStore,
    fail_next_upsert: AtomicBool,
}

impl FlakyStore {
    fn failing_once() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryBridgeStore::new(),
            fail_next_upsert: AtomicBool::new(true),
        })
    }
}

#[async_trait]
impl BridgeEntryStore for FlakyStore {
    async fn get(&self, key: &OriginKey) -> Result<Option<BridgeEntry>, StoreError> {
        self.inner.get(key).await
    }

    async fn upsert(&self, key: &OriginKey, platform: &str, remote_id: &str) -> Result<(), StoreError> {
        if self.fail_next_upsert.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.inner.upsert(key, platform, remote_id).await
    }

    async fn delete(&self, key: &OriginKey) -> Result<bool, StoreError> {
        self.inner.delete(key).await
    }

    async fn find_by_remote(
        &self,
        platform: &str,
        remote_id: &str,
    ) -> Result<Option<BridgeEntry>, StoreError> {
        self.inner.find_by_remote(platform, remote_id).await
    }
}

struct NoAssets;

#[async_trait]
impl AssetProbe for NoAssets {
    async fn reachable(&self, _url: &str) -> bool {
        false
    }
}

// ── Fixtures ────────────────────────────────────────────────────────────────

fn lobby(platforms: &[&str]) -> BridgeSet {
    BridgeSet {
        name: Some("lobby".into()),
        channels: platforms
            .iter()
            .map(|p| BridgeChannel::new(*p, format!("{p}-lobby")))
            .collect(),
    }
}

fn message(platform: &str, id: &str, content: &str) -> Message {
    Message {
        id: id.into(),
        channel: format!("{platform}-lobby"),
        author: Author {
            username: "Jane".into(),
            rawname: "jane".into(),
            id: "u1".into(),
            ..Default::default()
        },
        content: Some(content.into()),
        embeds: Vec::new(),
        attachments: Vec::new(),
        stickers: Vec::new(),
        kind: MessageKind::Default,
        timestamp: 1_700_000_000_000,
        platform: PlatformRef {
            name: platform.into(),
            native: serde_json::Value::Null,
        },
        reply_to: None,
    }
}

struct Harness {
    orchestrator: BridgeOrchestrator,
    store: Arc<dyn BridgeEntryStore>,
}

async fn harness_with_store(
    plugins: &[Arc<MockPlugin>],
    sets: &[BridgeSet],
    store: Arc<dyn BridgeEntryStore>,
) -> Harness {
    let mut registry = PluginRegistry::new();
    for plugin in plugins {
        registry.register(Arc::clone(plugin) as Arc<dyn Plugin>).unwrap();
    }
    let mut channels = BridgeChannels::from_config(sets);
    channels.wire(&registry).await;
    let orchestrator = BridgeOrchestrator::new(
        Arc::new(registry),
        Arc::clone(&store),
        channels,
        ContentConfig::default(),
        Arc::new(NoAssets),
    );
    Harness {
        orchestrator,
        store,
    }
}

async fn harness(plugins: &[Arc<MockPlugin>]) -> Harness {
    let names: Vec<&str> = plugins.iter().map(|p| p.name.as_str()).collect();
    harness_with_store(plugins, &[lobby(&names)], Arc::new(MemoryBridgeStore::new())).await
}

fn creates(plugin: &MockPlugin) -> usize {
    plugin
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::Create { .. }))
        .count()
}

// ── Create ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_bridges_to_every_other_platform() {
    let (a, b, c) = (MockPlugin::new("a"), MockPlugin::new("b"), MockPlugin::new("c"));
    let h = harness(&[a.clone(), b.clone(), c.clone()]).await;

    let report = h.orchestrator.handle_create(&message("a", "m1", "hello")).await.unwrap();
    assert_eq!(report.delivered().count(), 2);
    assert!(a.calls().is_empty());
    assert_eq!(b.calls(), [Call::Create {
        channel: "b-lobby".into(),
        content: Some("hello".into()),
        reply_to: None,
    }]);

    let entry = h.store.get(&OriginKey::new("a", "m1")).await.unwrap().unwrap();
    assert_eq!(entry.remote("b"), Some("b-1"));
    assert_eq!(entry.remote("c"), Some("c-1"));
    assert_eq!(entry.remote("a"), None);
}

#[tokio::test]
async fn repeated_create_yields_one_entry() {
    let (a, b, c) = (MockPlugin::new("a"), MockPlugin::new("b"), MockPlugin::new("c"));
    let h = harness(&[a, b.clone(), c.clone()]).await;
    let msg = message("a", "m1", "hello");

    h.orchestrator.handle_create(&msg).await.unwrap();
    let second = h.orchestrator.handle_create(&msg).await.unwrap();

    assert!(second.outcomes.iter().all(|o| o.result == TargetResult::Skipped {
        reason: SkipReason::AlreadyBridged
    }));
    assert_eq!(creates(&b), 1);
    assert_eq!(creates(&c), 1);
    let entry = h.store.get(&msg.origin_key()).await.unwrap().unwrap();
    assert_eq!(entry.remotes.len(), 2);
}

#[tokio::test]
async fn concurrent_duplicate_creates_are_serialized() {
    let (a, b) = (MockPlugin::new("a"), MockPlugin::new("b"));
    let h = harness(&[a, b.clone()]).await;
    let msg = message("a", "m1", "hello");

    let (first, second) = tokio::join!(
        h.orchestrator.handle_create(&msg),
        h.orchestrator.handle_create(&msg)
    );
    let delivered = first.unwrap().delivered().count() + second.unwrap().delivered().count();
    assert_eq!(delivered, 1);
    assert_eq!(creates(&b), 1);
}

#[tokio::test]
async fn plugin_reporting_bridged_is_skipped() {
    let (a, b, c) = (MockPlugin::new("a"), MockPlugin::new("b"), MockPlugin::new("c"));
    b.set_status(BridgeStatus::Bridged);
    let h = harness(&[a, b.clone(), c.clone()]).await;

    let report = h.orchestrator.handle_create(&message("a", "m1", "x")).await.unwrap();
    assert_eq!(report.outcome("b").unwrap().result, TargetResult::Skipped {
        reason: SkipReason::AlreadyBridged,
    });
    assert!(b.calls().is_empty());
    assert_eq!(creates(&c), 1);
}

#[tokio::test]
async fn not_bridged_status_bypasses_store_check() {
    let (a, b) = (MockPlugin::new("a"), MockPlugin::new("b"));
    b.set_status(BridgeStatus::NotBridged);
    let h = harness(&[a, b.clone()]).await;
    let msg = message("a", "m1", "x");

    h.orchestrator.handle_create(&msg).await.unwrap();
    h.orchestrator.handle_create(&msg).await.unwrap();

    assert_eq!(creates(&b), 2);
    let entry = h.store.get(&msg.origin_key()).await.unwrap().unwrap();
    assert_eq!(entry.remotes.len(), 1);
    assert_eq!(entry.remote("b"), Some("b-2"));
}

#[tokio::test]
async fn one_failing_target_does_not_affect_others() {
    let (a, b, c, d) = (
        MockPlugin::new("a"),
        MockPlugin::new("b"),
        MockPlugin::failing("c"),
        MockPlugin::new("d"),
    );
    let h = harness(&[a, b, c, d]).await;
    let msg = message("a", "m1", "x");

    let report = h.orchestrator.handle_create(&msg).await.unwrap();
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "c");
    assert!(failures[0].1.contains("simulated outage"));

    let entry = h.store.get(&msg.origin_key()).await.unwrap().unwrap();
    assert_eq!(entry.remotes.len(), 2);
    assert!(entry.remote("b").is_some());
    assert!(entry.remote("d").is_some());
    assert!(entry.remote("c").is_none());
}

#[tokio::test]
async fn empty_remote_ids_are_never_stored() {
    let (a, b) = (MockPlugin::new("a"), MockPlugin::new("b"));
    b.empty_ids.store(true, Ordering::SeqCst);
    let h = harness(&[a, b]).await;
    let msg = message("a", "m1", "x");

    let report = h.orchestrator.handle_create(&msg).await.unwrap();
    assert_eq!(report.failures().count(), 1);
    assert!(h.store.get(&msg.origin_key()).await.unwrap().is_none());
}

#[tokio::test]
async fn long_content_is_truncated_for_every_target() {
    let (a, b) = (MockPlugin::new("a"), MockPlugin::new("b"));
    let h = harness(&[a, b.clone()]).await;

    h.orchestrator
        .handle_create(&message("a", "m1", &"y".repeat(2100)))
        .await
        .unwrap();
    let calls = b.calls();
    let Call::Create { content, .. } = &calls[0] else {
        panic!("expected create");
    };
    let content = content.as_deref().unwrap();
    assert_eq!(content.chars().count(), 2000);
    assert!(content.ends_with("..."));
}

#[tokio::test]
async fn echo_of_own_copy_is_not_rebridged() {
    let (a, b) = (MockPlugin::new("a"), MockPlugin::new("b"));
    let h = harness(&[a.clone(), b.clone()]).await;
    h.orchestrator.handle_create(&message("a", "m1", "x")).await.unwrap();

    // Platform b reports the copy we just posted as a new message.
    let echo = message("b", "b-1", "x");
    let report = h.orchestrator.handle_create(&echo).await.unwrap();
    assert!(report.is_empty());
    assert!(a.calls().is_empty());
}

#[tokio::test]
async fn store_failure_keeps_other_copies_and_blocks_their_echo() {
    let plugins = [
        MockPlugin::new("a"),
        MockPlugin::new("b"),
        MockPlugin::new("c"),
        MockPlugin::new("d"),
    ];
    let h = harness_with_store(
        &plugins,
        &[lobby(&["a", "b", "c", "d"])],
        FlakyStore::failing_once(),
    )
    .await;

    let report = h.orchestrator.handle_create(&message("a", "m1", "x")).await.unwrap();
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    let (unrecorded, error) = failures[0];
    assert!(error.contains("not recorded"), "{error}");
    assert_eq!(report.delivered().count(), 2);

    let entry = h.store.get(&OriginKey::new("a", "m1")).await.unwrap().unwrap();
    assert_eq!(entry.remotes.len(), 2);
    assert_eq!(entry.remote(unrecorded), None);

    // The unrecorded copy comes back as a new message on its platform.
    let unrecorded = unrecorded.to_string();
    let echo = message(&unrecorded, &format!("{unrecorded}-1"), "x");
    let report = h.orchestrator.handle_create(&echo).await.unwrap();
    assert!(report.is_empty());
    for plugin in &plugins {
        let expected = usize::from(plugin.name != "a");
        assert_eq!(creates(plugin), expected, "plugin {}", plugin.name);
    }
}

#[tokio::test]
async fn origin_plugin_can_mark_its_own_posts() {
    let (a, b) = (MockPlugin::new("a"), MockPlugin::new("b"));
    a.set_status(BridgeStatus::Bridged);
    let h = harness(&[a, b.clone()]).await;

    let report = h.orchestrator.handle_create(&message("a", "m1", "x")).await.unwrap();
    assert!(report.is_empty());
    assert!(b.calls().is_empty());
}

#[tokio::test]
async fn unregistered_platform_is_skipped() {
    let (a, b) = (MockPlugin::new("a"), MockPlugin::new("b"));
    let h = harness_with_store(
        &[a, b.clone()],
        &[lobby(&["a", "b", "ghost"])],
        Arc::new(MemoryBridgeStore::new()),
    )
    .await;

    let report = h.orchestrator.handle_create(&message("a", "m1", "x")).await.unwrap();
    assert_eq!(report.outcome("ghost").unwrap().result, TargetResult::Skipped {
        reason: SkipReason::NotRegistered,
    });
    assert_eq!(report.delivered().count(), 1);
}

#[tokio::test]
async fn unbridged_channel_is_ignored() {
    let (a, b) = (MockPlugin::new("a"), MockPlugin::new("b"));
    let h = harness(&[a, b.clone()]).await;
    let mut msg = message("a", "m1", "x");
    msg.channel = "a-elsewhere".into();

    let report = h.orchestrator.handle_create(&msg).await.unwrap();
    assert!(report.is_empty());
    assert!(b.calls().is_empty());
}

// ── Replies ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unresolvable_reply_bridges_without_reference() {
    let (a, b) = (MockPlugin::new("a"), MockPlugin::new("b"));
    let h = harness(&[a, b.clone()]).await;
    let mut msg = message("a", "m2", "re");
    msg.reply_to = Some("never-bridged".into());

    let report = h.orchestrator.handle_create(&msg).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(b.calls(), [Call::Create {
        channel: "b-lobby".into(),
        content: Some("re".into()),
        reply_to: None,
    }]);
}

#[tokio::test]
async fn reply_is_mapped_to_each_platform() {
    let (a, b, c) = (MockPlugin::new("a"), MockPlugin::new("b"), MockPlugin::new("c"));
    let h = harness(&[a.clone(), b.clone(), c.clone()]).await;
    h.orchestrator.handle_create(&message("a", "parent", "q")).await.unwrap();

    // Reply on b to b's copy of the parent.
    let mut reply = message("b", "r1", "answer");
    reply.reply_to = Some("b-1".into());
    h.orchestrator.handle_create(&reply).await.unwrap();

    let a_reply = a.calls().into_iter().find_map(|call| match call {
        Call::Create { reply_to, .. } => Some(reply_to),
        _ => None,
    });
    assert_eq!(a_reply, Some(Some("parent".to_string())));
    let c_reply = c.calls().into_iter().rev().find_map(|call| match call {
        Call::Create { reply_to, .. } => Some(reply_to),
        _ => None,
    });
    assert_eq!(c_reply, Some(Some("c-1".to_string())));
}

// ── Edit ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn edit_reaches_exactly_the_recorded_platforms() {
    let (o, a, b, c) = (
        MockPlugin::new("o"),
        MockPlugin::new("a"),
        MockPlugin::new("b"),
        MockPlugin::new("c"),
    );
    let h = harness(&[o, a.clone(), b.clone(), c.clone()]).await;
    let key = OriginKey::new("o", "m1");
    h.store.upsert(&key, "a", "1").await.unwrap();
    h.store.upsert(&key, "b", "2").await.unwrap();

    let report = h
        .orchestrator
        .handle_edit(&message("o", "m1", "edited"))
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(a.calls(), [Call::Edit {
        id: "1".into(),
        content: Some("edited".into()),
    }]);
    assert_eq!(b.calls(), [Call::Edit {
        id: "2".into(),
        content: Some("edited".into()),
    }]);
    assert!(c.calls().is_empty());
    // Entry unchanged.
    assert_eq!(h.store.get(&key).await.unwrap().unwrap().remotes.len(), 2);
}

#[tokio::test]
async fn edit_of_unknown_message_is_a_noop() {
    let (a, b) = (MockPlugin::new("a"), MockPlugin::new("b"));
    let h = harness(&[a, b.clone()]).await;
    let report = h.orchestrator.handle_edit(&message("a", "m9", "x")).await.unwrap();
    assert!(report.is_empty());
    assert!(b.calls().is_empty());
}

#[tokio::test]
async fn edit_skips_platforms_no_longer_bridged() {
    let (a, b, gone) = (MockPlugin::new("a"), MockPlugin::new("b"), MockPlugin::new("gone"));
    let h = harness_with_store(
        &[a, b.clone(), gone.clone()],
        &[lobby(&["a", "b"])],
        Arc::new(MemoryBridgeStore::new()),
    )
    .await;
    let key = OriginKey::new("a", "m1");
    h.store.upsert(&key, "b", "b-7").await.unwrap();
    h.store.upsert(&key, "gone", "g-7").await.unwrap();

    let report = h
        .orchestrator
        .handle_edit(&message("a", "m1", "edited"))
        .await
        .unwrap();

    assert_eq!(report.outcome("gone").unwrap().result, TargetResult::Skipped {
        reason: SkipReason::NotConfigured,
    });
    assert_eq!(b.calls(), [Call::Edit {
        id: "b-7".into(),
        content: Some("edited".into()),
    }]);
    assert!(gone.calls().is_empty());
    assert_eq!(h.store.get(&key).await.unwrap().unwrap().remotes.len(), 2);
}

// ── Delete ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_removes_entry_even_when_a_platform_fails() {
    let (a, b, c) = (MockPlugin::new("a"), MockPlugin::new("b"), MockPlugin::failing("c"));
    let h = harness(&[a, b.clone(), c.clone()]).await;
    let key = OriginKey::new("a", "m1");
    h.store.upsert(&key, "b", "b-9").await.unwrap();
    h.store.upsert(&key, "c", "c-9").await.unwrap();

    let report = h
        .orchestrator
        .handle_delete(&message("a", "m1", "").to_deleted())
        .await
        .unwrap();

    assert_eq!(report.failures().count(), 1);
    assert_eq!(b.calls(), [Call::Delete { id: "b-9".into() }]);
    assert_eq!(c.calls(), [Call::Delete { id: "c-9".into() }]);
    assert!(h.store.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_skips_platforms_no_longer_bridged_and_forgets_entry() {
    let (a, b, gone) = (MockPlugin::new("a"), MockPlugin::new("b"), MockPlugin::new("gone"));
    let h = harness_with_store(
        &[a, b.clone(), gone.clone()],
        &[lobby(&["a", "b"])],
        Arc::new(MemoryBridgeStore::new()),
    )
    .await;
    let key = OriginKey::new("a", "m1");
    h.store.upsert(&key, "b", "b-7").await.unwrap();
    h.store.upsert(&key, "gone", "g-7").await.unwrap();

    let report = h
        .orchestrator
        .handle_delete(&message("a", "m1", "").to_deleted())
        .await
        .unwrap();

    assert_eq!(report.outcome("gone").unwrap().result, TargetResult::Skipped {
        reason: SkipReason::NotConfigured,
    });
    assert_eq!(b.calls(), [Call::Delete { id: "b-7".into() }]);
    assert!(gone.calls().is_empty());
    assert!(h.store.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_of_unknown_message_is_a_noop() {
    let (a, b) = (MockPlugin::new("a"), MockPlugin::new("b"));
    let h = harness(&[a, b.clone()]).await;
    let report = h
        .orchestrator
        .handle_delete(&message("a", "m9", "").to_deleted())
        .await
        .unwrap();
    assert!(report.is_empty());
    assert!(b.calls().is_empty());
}

#[tokio::test]
async fn full_lifecycle_on_sqlite_store() {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    lightning_store::run_migrations(&pool).await.unwrap();
    let store: Arc<dyn BridgeEntryStore> = Arc::new(SqliteBridgeStore::new(pool));

    let (a, b) = (MockPlugin::new("a"), MockPlugin::new("b"));
    let h = harness_with_store(&[a, b.clone()], &[lobby(&["a", "b"])], store).await;
    let msg = message("a", "m1", "v1");

    h.orchestrator.handle_create(&msg).await.unwrap();
    let mut edited = msg.clone();
    edited.content = Some("v2".into());
    h.orchestrator.handle_edit(&edited).await.unwrap();
    h.orchestrator.handle_delete(&msg.to_deleted()).await.unwrap();

    assert_eq!(b.calls().len(), 3);
    assert_eq!(b.calls()[1], Call::Edit {
        id: "b-1".into(),
        content: Some("v2".into()),
    });
    assert!(h.store.get(&msg.origin_key()).await.unwrap().is_none());
}

// ── Runtime ─────────────────────────────────────────────────────────────────

async fn next_event(rx: &mut tokio::sync::broadcast::Receiver<CoreEvent>) -> CoreEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn runtime_dispatches_plugin_events() {
    let (a, b) = (MockPlugin::new("a"), MockPlugin::new("b"));
    let config = LightningConfig {
        bridges: vec![lobby(&["a", "b"])],
        ..Default::default()
    };
    let lightning = Arc::new(
        Lightning::builder(config)
            .plugin(a.clone())
            .plugin(b.clone())
            .store(Arc::new(MemoryBridgeStore::new()))
            .probe(Arc::new(NoAssets))
            .build()
            .await
            .unwrap(),
    );
    let mut events = lightning.subscribe();
    let runner = {
        let lightning = Arc::clone(&lightning);
        tokio::spawn(async move { lightning.run().await })
    };

    let handle_a = lightning.handle("a").unwrap();
    let handle_b = lightning.handle("b").unwrap();
    assert!(lightning.handle("zzz").is_err());

    handle_a.ready().unwrap();
    handle_b.ready().unwrap();
    assert!(matches!(next_event(&mut events).await, CoreEvent::Ready));

    handle_a.create_message(message("a", "m1", "hi")).unwrap();
    assert!(matches!(next_event(&mut events).await, CoreEvent::Created(m) if m.id == "m1"));
    match next_event(&mut events).await {
        CoreEvent::Bridged(report) => assert_eq!(report.delivered().collect::<Vec<_>>(), [("b", "b-1")]),
        other => panic!("unexpected event: {other:?}"),
    }

    // Non-bridged creates are handled but never published.
    handle_a
        .create_nonbridged_message(message("a", "m2", "quiet"))
        .unwrap();
    handle_b.ready().unwrap();
    handle_a.delete_message(message("a", "m1", "").to_deleted()).unwrap();
    assert!(matches!(next_event(&mut events).await, CoreEvent::Deleted(m) if m.id == "m1"));

    lightning.shutdown_token().cancel();
    runner.await.unwrap().unwrap();
    assert!(handle_a.ready().is_err());
    assert!(lightning.registry().is_ready());
}
