pub mod migrations;
pub mod queries;
pub mod storage;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub use storage::{
    MemoryStorage, Storage, generate_id, keys, load_from_storage, remove_from_storage,
    save_to_storage,
};

/// SQLite-backed key-value namespace. Every store collection lives under one
/// key as a JSON document.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn open(path: &Path) -> Result<Self> {
        let storage = Self::init(Connection::open(path)?, true)?;
        info!("Storage opened at {}", path.display());
        Ok(storage)
    }

    /// A throwaway namespace, gone when dropped.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, false)
    }

    fn init(conn: Connection, wal: bool) -> Result<Self> {
        if wal {
            conn.pragma_update(None, "journal_mode", "WAL")?;
        }
        migrations::run(&conn)?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Run `f` against the connection, serialized behind the lock.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Storage lock poisoned: {}", e))?;
        f(&conn)
    }
}
