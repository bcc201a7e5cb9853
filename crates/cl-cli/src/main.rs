//! CopyLift CLI
//!
//! Offline tools for exported site-configuration files: validate the
//! format, inspect the normalized view of a site, and bulk-migrate
//! legacy boolean entries to the object form.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use cl_core::config::{ConfigBackend, SiteStore, StoredEntry};

mod config_file;

use config_file::JsonFileBackend;

#[derive(Parser)]
#[command(name = "cl-cli")]
#[command(about = "CopyLift site-configuration tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file and report its contents
    Validate {
        /// Configuration file to validate
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print the normalized configuration for one site
    Inspect {
        /// Configuration file to read
        #[arg(short, long)]
        input: PathBuf,

        /// Hostname to look up
        #[arg(long)]
        hostname: String,
    },

    /// Upgrade legacy boolean entries to the object form
    Migrate {
        /// Configuration file to migrate
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (defaults to migrating in place)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { input } => cmd_validate(&input),
        Commands::Inspect { input, hostname } => cmd_inspect(&input, &hostname),
        Commands::Migrate { input, output } => cmd_migrate(&input, output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_validate(input: &Path) -> Result<(), String> {
    let store = SiteStore::new(JsonFileBackend::in_place(input));
    let raw = store
        .backend()
        .load_sites()
        .map_err(|e| format!("Failed to read '{}': {e}", input.display()))?;

    let legacy = raw
        .values()
        .filter(|entry| matches!(entry, StoredEntry::Legacy(_)))
        .count();
    let enabled = store.all_sites().values().filter(|c| c.enabled).count();

    println!("Sites:   {}", raw.len());
    println!("Enabled: {enabled}");
    println!("Legacy:  {legacy}");
    if legacy > 0 {
        println!("Run `cl-cli migrate` to upgrade legacy entries.");
    }
    Ok(())
}

fn cmd_inspect(input: &Path, hostname: &str) -> Result<(), String> {
    let store = SiteStore::new(JsonFileBackend::in_place(input));
    store
        .backend()
        .load_sites()
        .map_err(|e| format!("Failed to read '{}': {e}", input.display()))?;

    let config = store.get_site_config(hostname);
    let json = serde_json::to_string_pretty(&config)
        .map_err(|e| format!("Failed to serialize configuration: {e}"))?;
    println!("{json}");
    Ok(())
}

fn cmd_migrate(input: &Path, output: Option<&Path>) -> Result<(), String> {
    let backend = match output {
        Some(output) => JsonFileBackend::new(input, output),
        None => JsonFileBackend::in_place(input),
    };

    let mut store = SiteStore::new(backend);
    let migrated = store
        .migrate()
        .map_err(|e| format!("Migration failed: {e}"))?;

    if migrated == 0 {
        println!("Nothing to migrate.");
    } else {
        println!("Migrated {migrated} legacy entries.");
    }
    Ok(())
}
