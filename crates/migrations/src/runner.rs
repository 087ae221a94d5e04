//! Confirm-before-commit migration flow.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::{
    documents::DocumentStore,
    engine::{Document, MigrationEngine},
    error::{Context, Result},
};

/// Yes/no decision supplied by the caller (an interactive prompt in the CLI).
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// How a migration run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// `from` and `to` are the same version.
    NothingToDo,
    /// The caller declined; the migrated documents are only in `file`.
    Declined { file: PathBuf, documents: usize },
    /// Documents were written to `collection`.
    Written {
        file: PathBuf,
        collection: String,
        documents: usize,
    },
}

pub struct MigrationRunner<'a> {
    engine: &'a MigrationEngine,
    store: &'a dyn DocumentStore,
    dump_dir: Option<PathBuf>,
}

impl<'a> MigrationRunner<'a> {
    pub fn new(engine: &'a MigrationEngine, store: &'a dyn DocumentStore) -> Self {
        Self {
            engine,
            store,
            dump_dir: None,
        }
    }

    /// Write migration dumps under `dir` instead of the system temp directory.
    #[must_use]
    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dir.into());
        self
    }

    /// Migrate the stored documents from `from` to `to`.
    ///
    /// The migrated set is always written to a kept temporary JSON file first;
    /// the target collection is only touched if `confirm` agrees.
    pub async fn run(&self, from: &str, to: &str, confirm: &dyn Confirm) -> Result<MigrationOutcome> {
        let path = self.engine.get_migrations(from, to)?;
        let (Some(source), Some(target)) = (path.source_collection(), path.target_collection())
        else {
            info!(from, to, "schema already at target version");
            return Ok(MigrationOutcome::NothingToDo);
        };

        let documents = self.store.find_all(source).await?;
        info!(from, to, source, count = documents.len(), "loaded documents");

        let migrated = self.engine.apply_migrations(&path, documents)?;
        let file = self.write_dump(&migrated)?;
        info!(file = %file.display(), count = migrated.len(), "wrote migrated documents");

        let prompt = format!(
            "{} documents migrated from {from} to {to} and saved to {}. Write them to '{target}'?",
            migrated.len(),
            file.display(),
        );
        if !confirm.confirm(&prompt) {
            info!(file = %file.display(), "migration not committed");
            return Ok(MigrationOutcome::Declined {
                file,
                documents: migrated.len(),
            });
        }

        let written = self.store.upsert_all(target, &migrated).await?;
        info!(collection = target, count = written, "migration committed");
        Ok(MigrationOutcome::Written {
            file,
            collection: target.to_string(),
            documents: written,
        })
    }

    fn write_dump(&self, documents: &[Document]) -> Result<PathBuf> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("lightning-migration-").suffix(".json");
        let file = match &self.dump_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .context("creating migration dump")?;

        serde_json::to_writer_pretty(file.as_file(), documents)?;
        let (_, path) = file.keep().map_err(|e| e.error)?;
        Ok(path)
    }
}

/// Read a dump written by [`MigrationRunner`].
pub fn read_dump(path: &Path) -> Result<Vec<Document>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(serde_json::from_str(&raw)?)
}
