use {anyhow::Result, clap::Subcommand};

use lightning_config::validate::{self, Severity};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the config file and database locations in use.
    Path,
}

pub fn handle_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Check { verbose } => check(verbose),
        ConfigAction::Path => {
            let config_path = lightning_config::find_or_default_config_path();
            let config = lightning_config::discover_and_load();
            println!("config:   {}", config_path.display());
            println!("database: {}", lightning_config::database_path(&config).display());
            Ok(())
        },
    }
}

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(verbose: bool) -> Result<()> {
    let result = validate::validate(None);

    match result.config_path {
        Some(ref path) => eprintln!("Checking {}\n", path.display()),
        None => eprintln!("No config file found; nothing is bridged with the defaults.\n"),
    }

    let shown: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| verbose || d.severity != Severity::Info)
        .collect();
    for d in &shown {
        let (color, label) = match d.severity {
            Severity::Error => (RED, "error"),
            Severity::Warning => (YELLOW, "warning"),
            Severity::Info => (CYAN, "info"),
        };
        let location = if d.path.is_empty() {
            String::new()
        } else {
            format!("{}: ", d.path)
        };
        eprintln!("  {BOLD}{color}{label}{RESET} {location}{}", d.message);
    }
    if !shown.is_empty() {
        eprintln!();
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);
    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        anyhow::bail!("configuration has {errors} error(s)");
    }
    Ok(())
}
