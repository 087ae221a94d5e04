//! In-memory bridge entry store.

use {async_trait::async_trait, dashmap::DashMap, lightning_common::OriginKey};

use crate::{BridgeEntry, BridgeEntryStore, Error, Result};

/// Process-local store. Entries are lost on restart.
#[derive(Default)]
pub struct MemoryBridgeStore {
    entries: DashMap<OriginKey, BridgeEntry>,
}

impl MemoryBridgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of every entry, ordered by origin key.
    pub fn entries(&self) -> Vec<BridgeEntry> {
        let mut entries: Vec<BridgeEntry> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by_key(BridgeEntry::key);
        entries
    }
}

#[async_trait]
impl BridgeEntryStore for MemoryBridgeStore {
    async fn get(&self, key: &OriginKey) -> Result<Option<BridgeEntry>> {
        Ok(self.entries.get(key).map(|e| e.value().clone()))
    }

    async fn upsert(&self, key: &OriginKey, platform: &str, remote_id: &str) -> Result<()> {
        if remote_id.is_empty() {
            return Err(Error::empty_remote_id(platform));
        }
        // The entry guard holds the shard lock, so concurrent upserts for the
        // same key are applied one after another.
        self.entries
            .entry(key.clone())
            .or_insert_with(|| BridgeEntry::new(key))
            .remotes
            .insert(platform.to_string(), remote_id.to_string());
        Ok(())
    }

    async fn delete(&self, key: &OriginKey) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn find_by_remote(
        &self,
        platform: &str,
        remote_id: &str,
    ) -> Result<Option<BridgeEntry>> {
        Ok(self
            .entries
            .iter()
            .find(|e| e.value().remote(platform) == Some(remote_id))
            .map(|e| e.value().clone()))
    }
}
