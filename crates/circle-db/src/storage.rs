use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;
use uuid::Uuid;

/// Keys of the shared namespace, one per persisted collection.
pub mod keys {
    pub const USERS: &str = "social_users";
    pub const SESSION: &str = "social_session";
    pub const FRIEND_REQUESTS: &str = "social_friend_requests";
    pub const MESSAGES: &str = "social_messages";
    pub const POSTS: &str = "social_posts";
}

/// A string key-value namespace, the shape of browser local storage.
pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// Process-local storage. Nothing outlives the value.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.lock().map_err(|e| anyhow!("Storage lock poisoned: {}", e))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock().map_err(|e| anyhow!("Storage lock poisoned: {}", e))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.lock().map_err(|e| anyhow!("Storage lock poisoned: {}", e))?;
        items.remove(key);
        Ok(())
    }
}

/// Read and parse `key`. Missing, empty, unreadable or malformed values all
/// yield `fallback`.
pub fn load_from_storage<T: DeserializeOwned>(storage: &dyn Storage, key: &str, fallback: T) -> T {
    let raw = match storage.get_item(key) {
        Ok(Some(raw)) if !raw.is_empty() => raw,
        Ok(_) => return fallback,
        Err(e) => {
            warn!("Failed to load \"{}\" from storage: {}", key, e);
            return fallback;
        }
    };

    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!("Failed to load \"{}\" from storage: {}", key, e);
        fallback
    })
}

/// Serialize `value` under `key`. Failures are logged and dropped.
pub fn save_to_storage<T: Serialize + ?Sized>(storage: &dyn Storage, key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .map_err(anyhow::Error::from)
        .and_then(|json| storage.set_item(key, &json));

    if let Err(e) = result {
        warn!("Failed to persist \"{}\" to storage: {}", key, e);
    }
}

pub fn remove_from_storage(storage: &dyn Storage, key: &str) {
    if let Err(e) = storage.remove_item(key) {
        warn!("Failed to remove \"{}\" from storage: {}", key, e);
    }
}

/// `<prefix>_<32 hex chars>`, e.g. `post_4f0c...`.
pub fn generate_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}
