// 🔧 Settings Store
// Free-form JSON settings + the all-or-nothing factory reset

use crate::auth::{self, DEFAULT_ADMIN_PASSWORD};
use crate::db::{self, ConfigStore};
use crate::error::{ForgeError, Result};
use rusqlite::{params, OptionalExtension};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct SettingsStore {
    store: Arc<ConfigStore>,
}

impl SettingsStore {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        SettingsStore { store }
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        let raw: Option<String> = self.store.read(|conn| {
            Ok(conn
                .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()?)
        })?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Insert or replace
    pub fn set(&self, key: &str, value: &Value) -> Result<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ForgeError::Config("setting key must not be empty".to_string()));
        }

        let encoded = serde_json::to_string(value)?;
        self.store.write(|tx| {
            tx.execute(
                "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, encoded, db::timestamp(db::now())],
            )?;
            Ok(())
        })?;

        debug!(key, "setting stored");
        Ok(())
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        self.store.read(|conn| {
            let mut stmt = conn.prepare("SELECT key FROM settings ORDER BY key")?;
            let keys = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(keys)
        })
    }

    /// Seed BINs, default admin, no sessions, no settings; one transaction
    pub fn reset_to_defaults(&self) -> Result<()> {
        let admin_hash = auth::hash_password(DEFAULT_ADMIN_PASSWORD)?;
        let now = db::now();

        self.store
            .write(|tx| db::restore_defaults(tx, &admin_hash, now))?;

        info!("config store reset to defaults; all sessions revoked");
        Ok(())
    }

    /// Location of the backing store file
    pub fn config_path(&self) -> String {
        self.store.path()
    }
}
