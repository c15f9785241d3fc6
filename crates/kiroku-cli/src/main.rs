mod commands;
mod format;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use kiroku_api::JikanClient;
use kiroku_core::config::AppConfig;
use kiroku_core::storage::{ListBackend, MemoryBackend, SqliteBackend};
use kiroku_core::store::ListStore;
use kiroku_core::views;

use commands::Command;

/// The store as the binary uses it: SQLite, or memory if the database
/// cannot be opened.
pub type Store = ListStore<Box<dyn ListBackend>>;

#[derive(Parser)]
#[command(name = "kiroku", author, version, about = "Personal anime list tracker", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the list database
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log filter, used when RUST_LOG is unset
    #[arg(short, long, global = true, default_value = "kiroku=info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    tracing::debug!(?config, "configuration loaded");

    let store = Arc::new(open_store(cli.db, &config));
    watch_list(&store);

    let catalog = JikanClient::from_config(&config.catalog)?;
    commands::run(cli.command, &store, &catalog).await
}

fn open_store(db: Option<PathBuf>, config: &AppConfig) -> Store {
    let options = config.library.store_options();
    let path = match db {
        Some(path) => Ok(path),
        None => AppConfig::ensure_db_path(),
    };
    let backend: Box<dyn ListBackend> = match path.and_then(|p| SqliteBackend::open(&p)) {
        Ok(db) => Box::new(db),
        Err(e) => {
            tracing::error!(error = %e, "failed to open list database; changes will not be saved");
            Box::new(MemoryBackend::new())
        }
    };
    ListStore::with_options(backend, options)
}

/// Re-read the list after every change and log the per-status badge counts.
fn watch_list(store: &Arc<Store>) {
    let weak = Arc::downgrade(store);
    store.subscribe(move || {
        let Some(store) = weak.upgrade() else {
            return;
        };
        let list = store.get_all();
        let counts: Vec<String> = views::status_counts(&list)
            .into_iter()
            .map(|(status, n)| format!("{}={n}", status.as_wire_str()))
            .collect();
        tracing::debug!(total = views::total_count(&list), counts = %counts.join(" "), "list refreshed");
    });
}
