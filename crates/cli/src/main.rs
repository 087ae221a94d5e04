mod config_commands;
mod db_commands;
mod migration_commands;

use {
    clap::{Parser, Subcommand},
    std::path::PathBuf,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "lightning", about = "Lightning: cross-platform chat bridge", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Custom config directory (overrides default ~/.config/lightning/).
    #[arg(long, global = true, env = "LIGHTNING_CONFIG_DIR")]
    config_dir: Option<PathBuf>,
    /// Custom data directory (overrides default data dir).
    #[arg(long, global = true, env = "LIGHTNING_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate stored bridge data between schema versions.
    Migrations(migration_commands::MigrationArgs),
    /// Database management (migrate, reset, stats).
    Db {
        #[command(subcommand)]
        action: db_commands::DbAction,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "lightning starting");

    // Directory overrides must be in place before any config is loaded.
    if let Some(ref dir) = cli.config_dir {
        lightning_config::set_config_dir(dir.clone());
    }
    if let Some(ref dir) = cli.data_dir {
        lightning_config::set_data_dir(dir.clone());
    }

    match cli.command {
        Commands::Migrations(args) => migration_commands::handle_migrations(args).await,
        Commands::Db { action } => db_commands::handle_db(action).await,
        Commands::Config { action } => config_commands::handle_config(action),
    }
}
