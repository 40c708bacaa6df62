// 🔐 Admin Auth Gate
// Credential check → opaque session token → lazy expiry

use crate::config::SessionConfig;
use crate::db::{self, ConfigStore};
use crate::error::{ForgeError, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shipped admin login. DEVELOPMENT ONLY: anyone who has read this file knows
/// it, so change it before the store holds anything worth protecting.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

// ============================================================================
// CREDENTIALS
// ============================================================================

/// Argon2id PHC string with a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ForgeError::Persistence(format!("password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("stored password hash is unreadable: {}", e);
            false
        }
    }
}

/// Random hex token from the OS CSPRNG
pub fn generate_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// What the store keeps instead of the token itself
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

// ============================================================================
// SESSION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSession {
    pub token: String,
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AdminSession {
    /// Valid iff `now < expires_at`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

enum LogoutOutcome {
    Removed,
    Expired,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct AuthGate {
    store: Arc<ConfigStore>,
    ttl: Duration,
    token_bytes: usize,
}

impl AuthGate {
    pub fn new(store: Arc<ConfigStore>, config: &SessionConfig) -> Self {
        AuthGate {
            store,
            ttl: Duration::hours(i64::from(config.expiry_hours)),
            token_bytes: config.token_bytes,
        }
    }

    pub fn with_ttl(store: Arc<ConfigStore>, ttl: Duration) -> Self {
        AuthGate {
            store,
            ttl,
            token_bytes: SessionConfig::default().token_bytes,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn login(&self, username: &str, password: &str) -> Result<AdminSession> {
        self.login_at(username, password, db::now())
    }

    /// Anonymous → Authenticated
    ///
    /// Unknown user and wrong password produce the same error.
    pub fn login_at(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<AdminSession> {
        let username = username.trim();
        let stored_hash: Option<String> = self.store.read(|conn| {
            Ok(conn
                .query_row(
                    "SELECT password_hash FROM admins WHERE username = ?1",
                    [username],
                    |row| row.get(0),
                )
                .optional()?)
        })?;

        // verify outside the store lock, argon2 is deliberately slow
        let accepted = stored_hash
            .as_deref()
            .map(|hash| verify_password(password, hash))
            .unwrap_or(false);

        if !accepted {
            warn!("admin login rejected");
            return Err(ForgeError::InvalidCredentials);
        }

        let session = AdminSession {
            token: generate_token(self.token_bytes),
            username: username.to_string(),
            issued_at: now,
            expires_at: now + self.ttl,
        };

        self.store.write(|tx| {
            tx.execute(
                "INSERT INTO sessions (id, token_digest, username, issued_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    uuid::Uuid::new_v4().to_string(),
                    token_digest(&session.token),
                    session.username,
                    db::timestamp(session.issued_at),
                    db::timestamp(session.expires_at),
                ],
            )?;
            tx.execute(
                "UPDATE admins SET last_login = ?1 WHERE username = ?2",
                params![db::timestamp(now), session.username],
            )?;
            Ok(())
        })?;

        info!(username = %session.username, "admin logged in");
        Ok(session)
    }

    /// Session for `token`, or `None` when unknown or expired
    ///
    /// Store failures are logged and read as "not authenticated".
    pub fn verify(&self, token: &str) -> Option<AdminSession> {
        match self.verify_at(token, db::now()) {
            Ok(session) => session,
            Err(e) => {
                warn!("session check failed: {}", e);
                None
            }
        }
    }

    /// An expired session found here is removed (lazy expiry)
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Option<AdminSession>> {
        let digest = token_digest(token);

        let found: Option<(String, String, String)> = self.store.read(|conn| {
            Ok(conn
                .query_row(
                    "SELECT username, issued_at, expires_at FROM sessions WHERE token_digest = ?1",
                    [&digest],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?)
        })?;

        let Some((username, issued_at, expires_at)) = found else {
            return Ok(None);
        };

        let session = AdminSession {
            token: token.to_string(),
            username,
            issued_at: db::parse_timestamp(&issued_at)?,
            expires_at: db::parse_timestamp(&expires_at)?,
        };

        if session.is_valid_at(now) {
            return Ok(Some(session));
        }

        self.store.write(|tx| {
            tx.execute("DELETE FROM sessions WHERE token_digest = ?1", [&digest])?;
            Ok(())
        })?;
        debug!(username = %session.username, "expired session dropped");
        Ok(None)
    }

    /// Session for `token`, or `SessionExpired`
    pub fn require(&self, token: &str) -> Result<AdminSession> {
        self.require_at(token, db::now())
    }

    pub fn require_at(&self, token: &str, now: DateTime<Utc>) -> Result<AdminSession> {
        self.verify_at(token, now)?.ok_or(ForgeError::SessionExpired)
    }

    pub fn logout(&self, token: &str) -> Result<()> {
        self.logout_at(token, db::now())
    }

    /// Authenticated → Anonymous; unknown or already expired tokens fail
    pub fn logout_at(&self, token: &str, now: DateTime<Utc>) -> Result<()> {
        let digest = token_digest(token);

        let outcome = self.store.write(|tx| {
            let expires_at: Option<String> = tx
                .query_row(
                    "SELECT expires_at FROM sessions WHERE token_digest = ?1",
                    [&digest],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(expires_at) = expires_at else {
                return Ok(LogoutOutcome::Unknown);
            };

            tx.execute("DELETE FROM sessions WHERE token_digest = ?1", [&digest])?;

            if now < db::parse_timestamp(&expires_at)? {
                Ok(LogoutOutcome::Removed)
            } else {
                Ok(LogoutOutcome::Expired)
            }
        })?;

        match outcome {
            LogoutOutcome::Removed => {
                info!("admin logged out");
                Ok(())
            }
            LogoutOutcome::Expired | LogoutOutcome::Unknown => Err(ForgeError::SessionExpired),
        }
    }

    /// Drop every session whose expiry has passed
    pub fn purge_expired(&self) -> Result<usize> {
        self.purge_expired_at(db::now())
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let removed = self.store.write(|tx| {
            Ok(tx.execute(
                "DELETE FROM sessions WHERE expires_at <= ?1",
                [db::timestamp(now)],
            )?)
        })?;

        if removed > 0 {
            info!("purged {} expired sessions", removed);
        }
        Ok(removed)
    }

    pub fn session_count(&self) -> Result<usize> {
        self.store.read(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0))?;
            Ok(n as usize)
        })
    }

    pub fn last_login(&self, username: &str) -> Result<Option<DateTime<Utc>>> {
        let raw: Option<Option<String>> = self.store.read(|conn| {
            Ok(conn
                .query_row(
                    "SELECT last_login FROM admins WHERE username = ?1",
                    [username],
                    |row| row.get(0),
                )
                .optional()?)
        })?;

        match raw.flatten() {
            Some(raw) => Ok(Some(db::parse_timestamp(&raw)?)),
            None => Ok(None),
        }
    }
}
