// 🗄️ Configuration Store
// One SQLite file for BINs, admin credentials, sessions and settings

use crate::auth::{self, DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME};
use crate::error::{ForgeError, Result};
use crate::registry;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, Transaction};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

/// Bumped when the table layout changes; a store below it gets (re)seeded
pub const SCHEMA_VERSION: i64 = 1;

pub const IN_MEMORY_PATH: &str = ":memory:";

/// Shared by BinRegistry, AuthGate and SettingsStore
///
/// The mutex is the single mutual-exclusion scope for every read and write.
#[derive(Debug)]
pub struct ConfigStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl ConfigStore {
    /// Open (or create and seed) a file-backed store
    pub fn open<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ForgeError::Persistence(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        // Enable WAL mode for crash recovery
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("store journal mode: {}", mode);

        let store = ConfigStore {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        };
        store.initialize()?;

        info!("config store opened at {}", path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = ConfigStore {
            conn: Mutex::new(Connection::open_in_memory()?),
            path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Store location as reported by `get-config-path`
    pub fn path(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => IN_MEMORY_PATH.to_string(),
        }
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // a panic mid-transaction already rolled back, so the connection is usable
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock();
        f(&conn)
    }

    /// Run `f` in one transaction; commit is the durability point
    ///
    /// Any error drops the transaction, which rolls it back.
    pub(crate) fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    pub fn schema_version(&self) -> Result<i64> {
        self.read(|conn| Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?))
    }

    fn initialize(&self) -> Result<()> {
        self.read(setup_schema)?;

        if self.schema_version()? >= SCHEMA_VERSION {
            return Ok(());
        }

        // hash outside the lock, it is the slow part
        let admin_hash = auth::hash_password(DEFAULT_ADMIN_PASSWORD)?;
        let now = now();

        self.write(|tx| {
            restore_defaults(tx, &admin_hash, now)?;
            tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
            Ok(())
        })?;

        info!("config store seeded with defaults");
        Ok(())
    }
}

pub fn setup_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS bins (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT UNIQUE NOT NULL,
            pattern TEXT NOT NULL,
            card_type TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS admins (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL,
            last_login TEXT
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            token_digest TEXT UNIQUE NOT NULL,
            username TEXT NOT NULL,
            issued_at TEXT NOT NULL,
            expires_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_bins_created ON bins(created_at, seq);
        CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);",
    )?;

    Ok(())
}

/// Wipe all four tables and write the shipped defaults, inside `tx`
pub(crate) fn restore_defaults(
    tx: &Transaction<'_>,
    admin_hash: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    tx.execute_batch(
        "DELETE FROM sessions;
         DELETE FROM admins;
         DELETE FROM bins;
         DELETE FROM settings;",
    )?;

    for bin in registry::default_bins(now) {
        registry::insert_bin(tx, &bin)?;
    }

    tx.execute(
        "INSERT INTO admins (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
        params![DEFAULT_ADMIN_USERNAME, admin_hash, timestamp(now)],
    )?;

    Ok(())
}

// ============================================================================
// TIMESTAMPS
// ============================================================================

/// Current time at the precision the store keeps
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width UTC form, so text comparison in SQL orders correctly
pub fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}
