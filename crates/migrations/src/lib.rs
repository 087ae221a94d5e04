//! Schema migration engine for persisted bridge data.
//!
//! [`MigrationEngine`] resolves a path through a fixed version list and
//! applies document transforms all-or-nothing. [`MigrationRunner`] wraps it
//! with the dump/confirm/commit sequence against a [`DocumentStore`].

pub mod builtin;
pub mod documents;
pub mod engine;
pub mod error;
pub mod runner;

pub use {
    documents::{DocumentStore, SqliteDocumentStore},
    engine::{Document, ID_FIELD, MigrationEngine, MigrationPath, MigrationStep, VERSIONS},
    error::{Error, Result},
    runner::{Confirm, MigrationOutcome, MigrationRunner, read_dump},
};

/// Run database migrations for the document store.
///
/// Creates the `documents` table and, because the entries collection lives
/// there, the bridge store's tables. Both share one migration ledger, hence
/// `set_ignore_missing`.
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    lightning_store::run_migrations(pool).await?;
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
