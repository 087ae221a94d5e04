use {
    anyhow::anyhow,
    clap::Subcommand,
    lightning_store::SqliteBridgeStore,
    std::path::{Path, PathBuf},
};

#[derive(Subcommand)]
pub enum DbAction {
    /// Run all pending database migrations.
    Migrate,
    /// Delete the database file (and its WAL/SHM companions).
    Reset,
    /// Show how many messages are currently bridged.
    Stats,
}

/// Database file from config, defaulting to `<data_dir>/lightning.db`.
pub fn db_path() -> PathBuf {
    let config = lightning_config::discover_and_load();
    lightning_config::database_path(&config)
}

/// Open (creating if needed) the database and bring every schema up to date.
pub async fn open_database(path: &Path) -> anyhow::Result<sqlx::SqlitePool> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let db_url = format!("sqlite:{}?mode=rwc", path.display());
    let pool = sqlx::SqlitePool::connect(&db_url).await?;

    lightning_store::run_migrations(&pool)
        .await
        .map_err(|e| anyhow!("bridge store migrations failed: {e}"))?;
    lightning_migrations::run_migrations(&pool)
        .await
        .map_err(|e| anyhow!("document migrations failed: {e}"))?;
    Ok(pool)
}

pub async fn handle_db(action: DbAction) -> anyhow::Result<()> {
    let path = db_path();
    match action {
        DbAction::Migrate => migrate(&path).await,
        DbAction::Reset => {
            let deleted = reset(&path)?;
            if deleted.is_empty() {
                println!("No database files found.");
            } else {
                for file in &deleted {
                    println!("Deleted: {}", file.display());
                }
                println!("Run `lightning db migrate` to recreate the database.");
            }
            Ok(())
        },
        DbAction::Stats => stats(&path).await,
    }
}

async fn migrate(path: &Path) -> anyhow::Result<()> {
    println!("Running migrations for {}...", path.display());
    let pool = open_database(path).await?;
    pool.close().await;
    println!("All migrations complete.");
    Ok(())
}

/// Remove the database and the files SQLite keeps next to it.
fn reset(path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut deleted = Vec::new();
    for suffix in ["", "-wal", "-shm"] {
        let mut name = path.as_os_str().to_owned();
        name.push(suffix);
        let file = PathBuf::from(name);
        if file.exists() {
            std::fs::remove_file(&file)?;
            deleted.push(file);
        }
    }
    Ok(deleted)
}

async fn stats(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        println!("Database not found: {}", path.display());
        return Ok(());
    }
    let pool = open_database(path).await?;
    let store = SqliteBridgeStore::new(pool.clone());
    let count = store
        .count()
        .await
        .map_err(|e| anyhow!("failed to count bridged messages: {e}"))?;
    println!("{count} bridged message(s) in {}", path.display());
    pool.close().await;
    Ok(())
}
