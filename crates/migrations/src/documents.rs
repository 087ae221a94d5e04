//! Document collections read and written by migrations.

use std::time::{SystemTime, UNIX_EPOCH};

use {
    async_trait::async_trait,
    lightning_store::{BridgeEntry, SqliteBridgeStore},
    serde_json::Value,
};

use crate::{
    builtin::ENTRIES_COLLECTION,
    engine::{Document, ID_FIELD},
    error::{Error, Result},
};

/// Collection-oriented storage the migration runner works against.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_all(&self, collection: &str) -> Result<Vec<Document>>;

    /// Insert or replace each document by its `_id`. Returns the number written.
    async fn upsert_all(&self, collection: &str, documents: &[Document]) -> Result<usize>;
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

fn id_key(collection: &str, doc: &Document) -> Result<String> {
    match doc.get(ID_FIELD) {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(Error::MissingId {
            collection: collection.to_string(),
        }),
    }
}

fn entry_document(entry: &BridgeEntry) -> Result<Document> {
    let mut doc = match serde_json::to_value(entry)? {
        Value::Object(map) => map,
        _ => Document::new(),
    };
    doc.insert(ID_FIELD.to_string(), Value::String(entry.key().to_string()));
    Ok(doc)
}

/// SQLite-backed document store.
///
/// Generic collections live in the `documents` table. The current entries
/// collection is the bridge store itself (`bridge_remotes`), so committed
/// migrations are what the running bridge reads.
pub struct SqliteDocumentStore {
    pool: sqlx::SqlitePool,
    entries: SqliteBridgeStore,
}

impl SqliteDocumentStore {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self {
            entries: SqliteBridgeStore::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn find_all(&self, collection: &str) -> Result<Vec<Document>> {
        if collection == ENTRIES_COLLECTION {
            return self.entries.all_entries().await?.iter().map(entry_document).collect();
        }
        let bodies = sqlx::query_scalar::<_, String>(
            "SELECT body FROM documents WHERE collection = ? ORDER BY id",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        bodies
            .iter()
            .map(|body| serde_json::from_str(body).map_err(Error::from))
            .collect()
    }

    async fn upsert_all(&self, collection: &str, documents: &[Document]) -> Result<usize> {
        // Validate everything before touching the table.
        let rows = documents
            .iter()
            .map(|doc| -> Result<(String, String)> {
                Ok((id_key(collection, doc)?, serde_json::to_string(doc)?))
            })
            .collect::<Result<Vec<_>>>()?;

        if collection == ENTRIES_COLLECTION {
            let entries = documents
                .iter()
                .map(|doc| -> Result<BridgeEntry> {
                    Ok(serde_json::from_value(Value::Object(doc.clone()))?)
                })
                .collect::<Result<Vec<_>>>()?;
            return Ok(self.entries.import(&entries).await?);
        }

        let now = now_ms();
        let mut tx = self.pool.begin().await?;
        for (id, body) in &rows {
            sqlx::query(
                r#"INSERT INTO documents (collection, id, body, updated_at)
                   VALUES (?, ?, ?, ?)
                   ON CONFLICT(collection, id) DO UPDATE SET
                     body = excluded.body,
                     updated_at = excluded.updated_at"#,
            )
            .bind(collection)
            .bind(id)
            .bind(body)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(rows.len())
    }
}
