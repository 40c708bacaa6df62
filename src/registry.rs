// 🗂️ BIN Registry
// Admin-curated generation templates, persisted in the config store

use crate::db::{self, ConfigStore};
use crate::error::{ForgeError, Result};
use crate::pattern::{validate_template, CardType, Pattern};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Owner recorded on the shipped seed records
pub const SYSTEM_USER: &str = "system";

// ============================================================================
// RECORDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinPattern {
    /// Assigned on creation, never changes
    pub id: String,
    pub pattern: String,
    pub card_type: CardType,
    pub description: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    /// Inactive records stay stored but drop out of `list_active`
    pub active: bool,
}

/// Input for `add`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBin {
    pub pattern: String,
    /// Detected from the pattern when omitted
    #[serde(default)]
    pub card_type: Option<CardType>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub active: Option<bool>,
}

/// Partial update; absent fields keep their value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinPatch {
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub card_type: Option<CardType>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl BinPatch {
    pub fn is_empty(&self) -> bool {
        self.pattern.is_none()
            && self.card_type.is_none()
            && self.description.is_none()
            && self.active.is_none()
    }
}

/// Shipped seed set
pub fn default_bins(now: DateTime<Utc>) -> Vec<BinPattern> {
    ["552461xxxxxxxxxx", "559888039xxxxxxx"]
        .iter()
        .map(|pattern| BinPattern {
            id: uuid::Uuid::new_v4().to_string(),
            pattern: pattern.to_string(),
            card_type: CardType::Mastercard,
            description: "Mastercard Debit".to_string(),
            created_by: SYSTEM_USER.to_string(),
            created_at: now,
            active: true,
        })
        .collect()
}

pub(crate) fn insert_bin(conn: &Connection, bin: &BinPattern) -> Result<()> {
    conn.execute(
        "INSERT INTO bins (id, pattern, card_type, description, created_by, created_at, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            bin.id,
            bin.pattern,
            bin.card_type.as_str(),
            bin.description,
            bin.created_by,
            db::timestamp(bin.created_at),
            bin.active,
        ],
    )?;
    Ok(())
}

const SELECT_BINS: &str =
    "SELECT id, pattern, card_type, description, created_by, created_at, active FROM bins";

fn bin_from_row(row: &Row<'_>) -> rusqlite::Result<BinPattern> {
    let card_type: String = row.get(2)?;
    let created_at: String = row.get(5)?;

    Ok(BinPattern {
        id: row.get(0)?,
        pattern: row.get(1)?,
        card_type: card_type.parse().unwrap_or(CardType::Unknown),
        description: row.get(3)?,
        created_by: row.get(4)?,
        created_at: db::parse_timestamp(&created_at)?,
        active: row.get(6)?,
    })
}

fn find_bin(conn: &Connection, id: &str) -> Result<Option<BinPattern>> {
    Ok(conn
        .query_row(&format!("{} WHERE id = ?1", SELECT_BINS), [id], bin_from_row)
        .optional()?)
}

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Debug, Clone)]
pub struct BinRegistry {
    store: Arc<ConfigStore>,
}

impl BinRegistry {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        BinRegistry { store }
    }

    /// Every record, oldest first (ties keep insertion order)
    pub fn list(&self) -> Result<Vec<BinPattern>> {
        self.store.read(|conn| {
            let mut stmt = conn.prepare(&format!("{} ORDER BY created_at, seq", SELECT_BINS))?;
            let bins = stmt
                .query_map([], bin_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(bins)
        })
    }

    pub fn list_active(&self) -> Result<Vec<BinPattern>> {
        self.store.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE active = 1 ORDER BY created_at, seq",
                SELECT_BINS
            ))?;
            let bins = stmt
                .query_map([], bin_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(bins)
        })
    }

    pub fn get(&self, id: &str) -> Result<BinPattern> {
        self.store
            .read(|conn| find_bin(conn, id))?
            .ok_or_else(|| ForgeError::NotFound(id.to_string()))
    }

    pub fn count(&self) -> Result<usize> {
        self.store.read(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM bins", [], |r| r.get(0))?;
            Ok(n as usize)
        })
    }

    /// Validate, assign id and creation time, persist
    pub fn add(&self, new: NewBin, created_by: &str) -> Result<BinPattern> {
        let pattern = validate_template(&new.pattern)?;
        let card_type = new
            .card_type
            .unwrap_or_else(|| CardType::detect(&pattern));

        let bin = BinPattern {
            id: uuid::Uuid::new_v4().to_string(),
            pattern,
            card_type,
            description: new.description.trim().to_string(),
            created_by: created_by.to_string(),
            created_at: db::now(),
            active: new.active.unwrap_or(true),
        };

        self.store.write(|tx| insert_bin(tx, &bin))?;

        info!(id = %bin.id, pattern = %bin.pattern, by = created_by, "BIN added");
        Ok(bin)
    }

    /// Apply `patch` to an existing record; `id` and creation data stay fixed
    ///
    /// A new pattern without an explicit card type re-detects the type.
    pub fn update(&self, id: &str, patch: BinPatch) -> Result<BinPattern> {
        let new_pattern = patch
            .pattern
            .as_deref()
            .map(validate_template)
            .transpose()?;

        let updated = self.store.write(|tx| {
            let mut bin =
                find_bin(tx, id)?.ok_or_else(|| ForgeError::NotFound(id.to_string()))?;

            if let Some(pattern) = new_pattern {
                if patch.card_type.is_none() {
                    bin.card_type = Pattern::parse(&pattern)?.card_type();
                }
                bin.pattern = pattern;
            }
            if let Some(card_type) = patch.card_type {
                bin.card_type = card_type;
            }
            if let Some(description) = &patch.description {
                bin.description = description.trim().to_string();
            }
            if let Some(active) = patch.active {
                bin.active = active;
            }

            tx.execute(
                "UPDATE bins SET pattern = ?1, card_type = ?2, description = ?3, active = ?4
                 WHERE id = ?5",
                params![
                    bin.pattern,
                    bin.card_type.as_str(),
                    bin.description,
                    bin.active,
                    bin.id
                ],
            )?;

            Ok(bin)
        })?;

        info!(id = %updated.id, active = updated.active, "BIN updated");
        Ok(updated)
    }

    /// Remove a record for good; use `update` with `active: false` to hide it
    pub fn delete(&self, id: &str) -> Result<bool> {
        let removed = self
            .store
            .write(|tx| Ok(tx.execute("DELETE FROM bins WHERE id = ?1", [id])?))?;

        if removed == 0 {
            return Err(ForgeError::NotFound(id.to_string()));
        }

        info!(id, "BIN deleted");
        Ok(true)
    }
}
