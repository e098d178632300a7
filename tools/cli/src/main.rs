//! VaultBridge CLI - Copy a password-manager export into another vault.
//!
//! Bitwarden credentials are read from `BITWARDEN_*` environment variables.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use vaultbridge_migrate::{load_vault, MigrationConfig, MigrationEngine, MigrationReport};
use vaultbridge_storage::{BitwardenConfig, BitwardenStore, CsvSource, FlatMemoryStore, Store};

#[derive(Parser)]
#[command(name = "vaultbridge")]
#[command(about = "VaultBridge - Vault migration between password managers")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Target {
    /// Bitwarden vault configured through the environment.
    Bitwarden,
    /// Throwaway in-memory vault, printed after the run.
    Memory,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy a Buttercup CSV export into the target vault.
    Migrate {
        /// Path to the CSV export.
        source: PathBuf,

        /// Where to copy the vault.
        #[arg(short, long, value_enum, default_value = "bitwarden")]
        target: Target,

        /// Delete everything in the target before copying.
        #[arg(long)]
        clear_target: bool,
    },

    /// Print a CSV export as a folder tree.
    Show {
        /// Path to the CSV export.
        source: PathBuf,
    },

    /// Print the Bitwarden vault as a folder tree.
    ShowTarget,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Migrate {
            source,
            target,
            clear_target,
        } => cmd_migrate(&source, target, clear_target).await,

        Commands::Show { source } => cmd_show(&source).await,

        Commands::ShowTarget => cmd_show_target().await,
    }
}

fn csv_store(path: &Path) -> Store {
    Store::from_shared(Arc::new(CsvSource::new(path)))
}

fn bitwarden_store() -> Result<Store> {
    let config = BitwardenConfig::from_lookup(|key| std::env::var(key).ok())
        .context("Invalid Bitwarden configuration")?;
    let store = BitwardenStore::new(config).context("Failed to create Bitwarden client")?;
    Ok(Store::from_shared(Arc::new(store)))
}

async fn print_tree(store: &Store) -> Result<()> {
    let index = load_vault(store).await.context("Failed to load vault")?;
    println!("{}", index.to_json().context("Failed to render vault")?);
    Ok(())
}

fn print_report(report: &MigrationReport) {
    println!("Migration complete in {:.2?}", report.duration);
    println!(
        "  Folders: {} created, {} reused",
        report.folders_created, report.folders_reused
    );
    println!(
        "  Entries: {} created, {} skipped",
        report.entries_created, report.entries_skipped
    );
    if report.deletes() > 0 {
        println!(
            "  Cleared: {} folders, {} entries",
            report.folders_deleted, report.entries_deleted
        );
    }
}

/// Run a migration.
async fn cmd_migrate(source: &Path, target: Target, clear_target: bool) -> Result<()> {
    info!("Migrating {} into {:?}", source.display(), target);

    let target_store = match target {
        Target::Bitwarden => bitwarden_store()?,
        Target::Memory => Store::from_shared(Arc::new(FlatMemoryStore::new())),
    };

    let engine = MigrationEngine::new(
        csv_store(source),
        target_store.clone(),
        MigrationConfig { clear_target },
    );
    let report = engine.execute().await.context("Migration failed")?;
    print_report(&report);

    if target == Target::Memory {
        print_tree(&target_store).await?;
    }

    Ok(())
}

/// Print the source vault.
async fn cmd_show(source: &Path) -> Result<()> {
    info!("Reading {}", source.display());
    print_tree(&csv_store(source)).await
}

/// Print the Bitwarden vault.
async fn cmd_show_target() -> Result<()> {
    info!("Reading Bitwarden vault");
    print_tree(&bitwarden_store()?).await
}
