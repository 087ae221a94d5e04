//! Persistent mapping from an origin message to its bridged copies.
//!
//! Each origin key `(platform, message id)` owns at most one [`BridgeEntry`],
//! which maps target platform names to the remote message ids created there.
//! The SQLite store keeps one row per remote; the in-memory store backs tests
//! and ephemeral runs.

pub mod entry;
pub mod error;
pub mod memory;
pub mod sqlite;

use {async_trait::async_trait, lightning_common::OriginKey};

pub use {
    entry::BridgeEntry,
    error::{Error, Result},
    memory::MemoryBridgeStore,
    sqlite::SqliteBridgeStore,
};

/// CRUD contract the bridge orchestrator relies on.
///
/// `upsert` must be safe to call concurrently for the same key from several
/// platform completions: entries are unioned across platforms and the last
/// writer wins for a given platform.
#[async_trait]
pub trait BridgeEntryStore: Send + Sync {
    async fn get(&self, key: &OriginKey) -> Result<Option<BridgeEntry>>;

    /// Record `remote_id` as the copy of `key` on `platform`. Idempotent.
    async fn upsert(&self, key: &OriginKey, platform: &str, remote_id: &str) -> Result<()>;

    /// Remove the entry. Returns `true` if anything was deleted.
    async fn delete(&self, key: &OriginKey) -> Result<bool>;

    /// Find the entry that owns the copy `remote_id` on `platform`.
    async fn find_by_remote(&self, platform: &str, remote_id: &str)
    -> Result<Option<BridgeEntry>>;
}

/// Run database migrations for the bridge store.
///
/// Creates the `bridge_remotes` table. Shares the migration ledger with the
/// document store, hence `set_ignore_missing`.
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
