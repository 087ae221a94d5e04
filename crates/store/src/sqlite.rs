//! SQLite-backed bridge entry store.
//!
//! One `bridge_remotes` row per `(origin_platform, origin_id, platform)`; an
//! entry exists as long as at least one row for its origin key does.

use std::time::{SystemTime, UNIX_EPOCH};

use {async_trait::async_trait, lightning_common::OriginKey, tracing::debug};

use crate::{BridgeEntry, BridgeEntryStore, Error, Result};

#[derive(sqlx::FromRow)]
struct RemoteRow {
    origin_platform: String,
    origin_id: String,
    platform: String,
    remote_id: String,
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Fold rows belonging to one origin key into an entry.
fn collect_entry(rows: Vec<RemoteRow>) -> Option<BridgeEntry> {
    let mut rows = rows.into_iter();
    let first = rows.next()?;
    let mut entry = BridgeEntry::new(&OriginKey::new(first.origin_platform, first.origin_id));
    entry.remotes.insert(first.platform, first.remote_id);
    for row in rows {
        entry.remotes.insert(row.platform, row.remote_id);
    }
    Some(entry)
}

pub struct SqliteBridgeStore {
    pool: sqlx::SqlitePool,
}

impl SqliteBridgeStore {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `path` and run migrations.
    pub async fn open(path: &std::path::Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        debug!(path = %path.display(), "opening bridge store");
        let url = format!("sqlite:{}?mode=rwc", path.display());
        let pool = sqlx::SqlitePool::connect(&url).await?;
        crate::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.pool
    }

    /// Every entry, ordered by origin key.
    pub async fn all_entries(&self) -> Result<Vec<BridgeEntry>> {
        let rows = sqlx::query_as::<_, RemoteRow>(
            "SELECT origin_platform, origin_id, platform, remote_id FROM bridge_remotes \
             ORDER BY origin_platform, origin_id, platform",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut entries: Vec<BridgeEntry> = Vec::new();
        for row in rows {
            match entries.last_mut() {
                Some(entry)
                    if entry.origin_platform == row.origin_platform
                        && entry.origin_id == row.origin_id =>
                {
                    entry.remotes.insert(row.platform, row.remote_id);
                },
                _ => {
                    let key = OriginKey::new(row.origin_platform, row.origin_id);
                    let mut entry = BridgeEntry::new(&key);
                    entry.remotes.insert(row.platform, row.remote_id);
                    entries.push(entry);
                },
            }
        }
        Ok(entries)
    }

    /// Replace the stored remotes of each entry in one transaction.
    ///
    /// Nothing is written if any entry carries an empty remote id.
    pub async fn import(&self, entries: &[BridgeEntry]) -> Result<usize> {
        for entry in entries {
            if let Some((platform, _)) = entry.remotes.iter().find(|(_, id)| id.is_empty()) {
                return Err(Error::empty_remote_id(platform));
            }
        }

        let now = now_ms();
        let mut tx = self.pool.begin().await?;
        for entry in entries {
            sqlx::query("DELETE FROM bridge_remotes WHERE origin_platform = ? AND origin_id = ?")
                .bind(&entry.origin_platform)
                .bind(&entry.origin_id)
                .execute(&mut *tx)
                .await?;
            for (platform, remote_id) in &entry.remotes {
                sqlx::query(
                    "INSERT INTO bridge_remotes (origin_platform, origin_id, platform, remote_id, updated_at) \
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(&entry.origin_platform)
                .bind(&entry.origin_id)
                .bind(platform)
                .bind(remote_id)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
        }
        tx.commit().await?;
        debug!(count = entries.len(), "imported bridge entries");
        Ok(entries.len())
    }

    /// Number of distinct origin messages currently bridged.
    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM (SELECT DISTINCT origin_platform, origin_id FROM bridge_remotes)",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[async_trait]
impl BridgeEntryStore for SqliteBridgeStore {
    async fn get(&self, key: &OriginKey) -> Result<Option<BridgeEntry>> {
        let rows = sqlx::query_as::<_, RemoteRow>(
            "SELECT origin_platform, origin_id, platform, remote_id FROM bridge_remotes \
             WHERE origin_platform = ? AND origin_id = ? ORDER BY platform",
        )
        .bind(&key.platform)
        .bind(&key.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(collect_entry(rows))
    }

    async fn upsert(&self, key: &OriginKey, platform: &str, remote_id: &str) -> Result<()> {
        if remote_id.is_empty() {
            return Err(Error::empty_remote_id(platform));
        }
        sqlx::query(
            r#"INSERT INTO bridge_remotes (origin_platform, origin_id, platform, remote_id, updated_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(origin_platform, origin_id, platform) DO UPDATE SET
                 remote_id = excluded.remote_id,
                 updated_at = excluded.updated_at"#,
        )
        .bind(&key.platform)
        .bind(&key.id)
        .bind(platform)
        .bind(remote_id)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &OriginKey) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM bridge_remotes WHERE origin_platform = ? AND origin_id = ?")
                .bind(&key.platform)
                .bind(&key.id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_remote(
        &self,
        platform: &str,
        remote_id: &str,
    ) -> Result<Option<BridgeEntry>> {
        let owner = sqlx::query_as::<_, (String, String)>(
            "SELECT origin_platform, origin_id FROM bridge_remotes \
             WHERE platform = ? AND remote_id = ? LIMIT 1",
        )
        .bind(platform)
        .bind(remote_id)
        .fetch_optional(&self.pool)
        .await?;

        match owner {
            Some((origin_platform, origin_id)) => {
                self.get(&OriginKey::new(origin_platform, origin_id)).await
            },
            None => Ok(None),
        }
    }
}
