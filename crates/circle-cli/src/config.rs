use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Result, bail};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    /// Nothing is written to disk; every invocation starts from the seed data.
    Memory,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => bail!("Unknown storage backend '{}' (expected sqlite or memory)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub backend: Backend,
}

impl Config {
    /// Environment (after `.env`) with defaults. `db_override` comes from
    /// `--db` and wins over `CIRCLE_DB_PATH`.
    pub fn load(db_override: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_override {
            Some(path) => path,
            None => PathBuf::from(var_or("CIRCLE_DB_PATH", "circle.db")),
        };
        let backend = var_or("CIRCLE_STORAGE", "sqlite").parse()?;

        Ok(Self { db_path, backend })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{} not set, using default: {}", key, default);
        default.to_string()
    })
}
