//! Haven CLI
//!
//! Operator tool for the crisis-resource allowlist: check URLs against
//! it, inspect and validate persisted state, seed a state directory, and
//! run a one-shot sync.

use std::fs;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use hv_core::snapshot::AllowlistSnapshot;
use hv_core::storage::AllowlistStorage;
use hv_core::store::AllowlistStore;
use hv_core::{Guard, Protection};
use hv_sync::SyncClient;

mod storage;

use storage::FileStorage;

#[derive(Parser)]
#[command(name = "hv-cli")]
#[command(about = "Haven crisis-allowlist tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a URL is protected
    Check {
        /// URL to check
        url: String,

        /// State directory with a persisted allowlist (bundled defaults
        /// if omitted)
        #[arg(short, long)]
        state_dir: Option<String>,
    },

    /// Show allowlist version and size
    Info {
        /// State directory (bundled defaults if omitted)
        #[arg(short, long)]
        state_dir: Option<String>,
    },

    /// Validate a persisted snapshot file
    Validate {
        /// Snapshot JSON file to validate
        #[arg(short, long)]
        input: String,
    },

    /// Write the bundled default snapshot into a state directory
    Seed {
        /// State directory to seed
        #[arg(short, long)]
        state_dir: String,
    },

    /// Fetch the allowlist from the server once
    Sync {
        /// Allowlist endpoint URL
        #[arg(short, long)]
        endpoint: String,

        /// State directory to sync into
        #[arg(short, long)]
        state_dir: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { url, state_dir } => cmd_check(&url, state_dir.as_deref()),
        Commands::Info { state_dir } => cmd_info(state_dir.as_deref()),
        Commands::Validate { input } => cmd_validate(&input),
        Commands::Seed { state_dir } => cmd_seed(&state_dir),
        Commands::Sync {
            endpoint,
            state_dir,
        } => cmd_sync(&endpoint, &state_dir).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_store(state_dir: Option<&str>) -> AllowlistStore {
    match state_dir {
        Some(dir) => AllowlistStore::load(&FileStorage::new(dir)),
        None => AllowlistStore::from_bundled(),
    }
}

fn cmd_check(url: &str, state_dir: Option<&str>) -> Result<(), String> {
    let guard = Guard::new(Arc::new(load_store(state_dir)));

    let decision = guard.check_url(url);
    let verdict = if decision.is_protected() {
        "PROTECTED (capture suppressed)"
    } else {
        "not protected"
    };

    println!("{verdict}");
    println!(
        "  Reason:    {}",
        match decision {
            Protection::Exact => "exact allowlist match".to_string(),
            Protection::Fuzzy { distance } => format!("fuzzy match, edit distance {distance}"),
            Protection::MalformedUrl => "web URL without a parseable host".to_string(),
            Protection::NotWeb => "not a web URL".to_string(),
            Protection::NotListed => "no allowlist match".to_string(),
        }
    );
    println!("  Allowlist: {} ({} domains)", guard.allowlist_version(), guard.protected_domain_count());

    Ok(())
}

fn cmd_info(state_dir: Option<&str>) -> Result<(), String> {
    let store = load_store(state_dir);
    let snapshot = store.snapshot();

    println!("Allowlist");
    println!("  Version:      {}", snapshot.version);
    println!("  Last updated: {}", snapshot.last_updated.to_rfc3339());
    println!("  Domains:      {}", store.domain_count());

    Ok(())
}

fn cmd_validate(input: &str) -> Result<(), String> {
    let raw = fs::read_to_string(input).map_err(|e| format!("Failed to read '{input}': {e}"))?;

    let snapshot: AllowlistSnapshot =
        serde_json::from_str(&raw).map_err(|e| format!("Invalid snapshot: {e}"))?;
    snapshot
        .validate()
        .map_err(|e| format!("Invalid snapshot: {e}"))?;

    println!("Snapshot '{input}' is valid");
    println!("  Version:  {}", snapshot.version);
    println!("  Domains:  {}", snapshot.domains.len());

    Ok(())
}

fn cmd_seed(state_dir: &str) -> Result<(), String> {
    let storage = FileStorage::new(state_dir);
    let snapshot = AllowlistSnapshot::bundled();

    storage
        .save_snapshot(&snapshot)
        .map_err(|e| format!("Failed to seed '{state_dir}': {e}"))?;

    println!("Seeded '{state_dir}' with {} ({} domains)", snapshot.version, snapshot.domains.len());

    Ok(())
}

async fn cmd_sync(endpoint: &str, state_dir: &str) -> Result<(), String> {
    let storage = FileStorage::new(state_dir);
    let store = AllowlistStore::load(&storage);
    let before = store.version();

    let client = SyncClient::new(endpoint).map_err(|e| format!("Failed to build client: {e}"))?;
    let changed = client.sync_from_server(&store, &storage).await;

    if changed {
        println!("Allowlist updated: {} -> {} ({} domains)", before, store.version(), store.domain_count());
    } else {
        println!("Allowlist unchanged ({}, {} domains)", store.version(), store.domain_count());
    }

    Ok(())
}
