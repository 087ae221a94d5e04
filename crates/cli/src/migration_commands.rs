use std::{
    io::{BufRead, Write},
    path::PathBuf,
};

use {
    anyhow::{Result, anyhow},
    clap::Args,
    lightning_migrations::{MigrationEngine, MigrationOutcome, MigrationRunner, SqliteDocumentStore},
};

use crate::db_commands;

#[derive(Args)]
pub struct MigrationArgs {
    /// Version the stored data is at (prompted when omitted).
    #[arg(long)]
    pub from: Option<String>,
    /// Version to migrate to (prompted when omitted).
    #[arg(long)]
    pub to: Option<String>,
    /// Write the result without asking for confirmation.
    #[arg(long, short)]
    pub yes: bool,
    /// Directory for the migrated-documents dump (defaults to the system temp dir).
    #[arg(long)]
    pub dump_dir: Option<PathBuf>,
}

/// Ask for one line of input. An empty answer falls back to `default`.
fn ask<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
    default: Option<&str>,
) -> Result<String> {
    match default {
        Some(value) => write!(output, "{prompt} [{value}]: ")?,
        None => write!(output, "{prompt}: ")?,
    }
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(anyhow!("no answer for '{prompt}' (end of input)"));
    }
    match line.trim() {
        "" => default
            .map(str::to_string)
            .ok_or_else(|| anyhow!("{prompt} is required")),
        answer => Ok(answer.to_string()),
    }
}

/// Yes/no question defaulting to "no".
fn ask_yes_no<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> Result<bool> {
    loop {
        let answer = ask(input, output, &format!("{prompt} [y/N]"), Some("n"))?;
        match answer.to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(output, "Please answer with 'y' or 'n'.")?,
        }
    }
}

/// Blocking terminal prompt, run off the async worker.
fn stdin_confirm(prompt: &str) -> bool {
    tokio::task::block_in_place(|| {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut output = std::io::stdout();
        // An unreadable terminal counts as "no": nothing is written.
        ask_yes_no(&mut input, &mut output, prompt).unwrap_or(false)
    })
}

pub async fn handle_migrations(args: MigrationArgs) -> Result<()> {
    let engine = MigrationEngine::with_builtin_steps();
    println!("Known schema versions: {}", engine.versions().join(", "));

    let (from, to) = tokio::task::block_in_place(|| -> Result<(String, String)> {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut output = std::io::stdout();
        let from = match args.from {
            Some(from) => from,
            None => ask(&mut input, &mut output, "Migrate from version", None)?,
        };
        let to = match args.to {
            Some(to) => to,
            None => ask(&mut input, &mut output, "Migrate to version", None)?,
        };
        Ok((from, to))
    })?;

    // Fail on unknown versions before touching the database.
    let path = engine.get_migrations(&from, &to)?;
    if path.is_empty() {
        println!("Already at version {to}; nothing to migrate.");
        return Ok(());
    }
    println!(
        "Migrating {from} -> {to} in {} step(s), reading '{}'.",
        path.len(),
        path.source_collection().unwrap_or_default()
    );

    let db = db_commands::db_path();
    let pool = db_commands::open_database(&db).await?;
    let store = SqliteDocumentStore::new(pool.clone());
    let mut runner = MigrationRunner::new(&engine, &store);
    if let Some(dir) = args.dump_dir {
        runner = runner.with_dump_dir(dir);
    }

    let yes = args.yes;
    let confirm = move |prompt: &str| yes || stdin_confirm(prompt);
    let outcome = runner.run(&from, &to, &confirm).await;
    pool.close().await;

    match outcome? {
        MigrationOutcome::NothingToDo => println!("Nothing to migrate."),
        MigrationOutcome::Declined { file, documents } => {
            println!(
                "Not written. {documents} migrated document(s) left in {}",
                file.display()
            );
        },
        MigrationOutcome::Written {
            file,
            collection,
            documents,
        } => {
            println!(
                "Wrote {documents} document(s) to '{collection}' (copy kept in {}).",
                file.display()
            );
        },
    }
    Ok(())
}
