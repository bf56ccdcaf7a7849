mod cli;
mod commands;
mod config;

use std::io;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use circle_db::{MemoryStorage, SqliteStorage, Storage};
use circle_store::Circle;

use crate::cli::Cli;
use crate::config::{Backend, Config};

fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout is for command output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "circle=info,circle_store=info,circle_db=warn".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.db)?;

    let storage: Arc<dyn Storage> = match config.backend {
        Backend::Sqlite => Arc::new(SqliteStorage::open(&config.db_path)?),
        Backend::Memory => {
            info!("Using in-memory storage; nothing will be saved");
            Arc::new(MemoryStorage::new())
        }
    };

    let mut circle = Circle::open(storage);
    commands::run(&mut circle, cli.command, &mut io::stdout().lock())
}
