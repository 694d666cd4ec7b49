//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file and in-memory databases. A single connection is
//! reused for all operations; `libsql::Connection` is `Send + Sync` and
//! safe for concurrent async use.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;

use crate::catalog::SkillLevel;
use crate::error::DatabaseError;
use crate::model::{PlayerProfile, Session};
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Convert `Option<&str>` to a libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Serialize an availability set as the JSON array the column stores.
fn availability_to_json(availability: &BTreeSet<String>) -> Result<String, DatabaseError> {
    serde_json::to_string(availability)
        .map_err(|e| DatabaseError::Serialization(format!("availability encode failed: {e}")))
}

/// Parse the JSON availability column back into a set.
fn availability_from_json(raw: &str) -> Result<BTreeSet<String>, DatabaseError> {
    serde_json::from_str(raw)
        .map_err(|e| DatabaseError::Serialization(format!("availability decode failed: {e}")))
}

const PLAYER_COLUMNS: &str = "telegram_id, username, skill_level, availability, active";

/// Map a libsql row (PLAYER_COLUMNS order) to a PlayerProfile.
fn row_to_profile(row: &libsql::Row) -> Result<PlayerProfile, DatabaseError> {
    let telegram_id: i64 = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("bad telegram_id column: {e}")))?;
    let username: Option<String> = row.get(1).ok();
    let skill_str: String = row
        .get(2)
        .map_err(|e| DatabaseError::Query(format!("bad skill_level column: {e}")))?;
    let availability_str: String = row
        .get(3)
        .map_err(|e| DatabaseError::Query(format!("bad availability column: {e}")))?;
    let active: i64 = row
        .get(4)
        .map_err(|e| DatabaseError::Query(format!("bad active column: {e}")))?;

    let skill_level: SkillLevel = skill_str
        .parse()
        .map_err(|e: String| DatabaseError::Serialization(e))?;

    Ok(PlayerProfile {
        telegram_id,
        username,
        skill_level,
        availability: availability_from_json(&availability_str)?,
        active: active != 0,
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Sessions ────────────────────────────────────────────────────

    async fn get_session(&self, user_id: i64) -> Result<Option<Session>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT state FROM user_sessions WHERE telegram_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_session failed: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let blob: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("bad state column: {e}")))?;
                let session = serde_json::from_str(&blob).map_err(|e| {
                    DatabaseError::Serialization(format!("session decode failed: {e}"))
                })?;
                Ok(Some(session))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_session failed: {e}"))),
        }
    }

    async fn set_session(&self, user_id: i64, session: &Session) -> Result<(), DatabaseError> {
        let blob = serde_json::to_string(session)
            .map_err(|e| DatabaseError::Serialization(format!("session encode failed: {e}")))?;
        let now = Utc::now().to_rfc3339();

        self.conn()
            .execute(
                "INSERT INTO user_sessions (telegram_id, state, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (telegram_id)
                 DO UPDATE SET state = ?2, updated_at = ?3",
                params![user_id, blob, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_session failed: {e}")))?;
        Ok(())
    }

    async fn delete_session(&self, user_id: i64) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "DELETE FROM user_sessions WHERE telegram_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_session failed: {e}")))?;
        Ok(())
    }

    // ── Profiles ────────────────────────────────────────────────────

    async fn upsert_profile(&self, profile: &PlayerProfile) -> Result<(), DatabaseError> {
        let availability = availability_to_json(&profile.availability)?;
        let now = Utc::now().to_rfc3339();

        self.conn()
            .execute(
                "INSERT INTO players (telegram_id, username, skill_level, availability, active, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (telegram_id)
                 DO UPDATE SET username = ?2, skill_level = ?3, availability = ?4,
                               active = ?5, updated_at = ?6",
                params![
                    profile.telegram_id,
                    opt_text(profile.username.as_deref()),
                    profile.skill_level.as_str(),
                    availability,
                    profile.active as i64,
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_profile failed: {e}")))?;
        Ok(())
    }

    async fn get_profile(&self, user_id: i64) -> Result<Option<PlayerProfile>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {PLAYER_COLUMNS} FROM players WHERE telegram_id = ?1"),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_profile failed: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_profile(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_profile failed: {e}"))),
        }
    }

    async fn set_active(&self, user_id: i64, active: bool) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "UPDATE players SET active = ?1, updated_at = ?2 WHERE telegram_id = ?3",
                params![active as i64, now, user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_active failed: {e}")))?;
        Ok(())
    }

    async fn update_skill(&self, user_id: i64, skill: SkillLevel) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "UPDATE players SET skill_level = ?1, updated_at = ?2 WHERE telegram_id = ?3",
                params![skill.as_str(), now, user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_skill failed: {e}")))?;
        Ok(())
    }

    async fn update_availability(
        &self,
        user_id: i64,
        availability: &BTreeSet<String>,
    ) -> Result<(), DatabaseError> {
        let json = availability_to_json(availability)?;
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "UPDATE players SET availability = ?1, updated_at = ?2 WHERE telegram_id = ?3",
                params![json, now, user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_availability failed: {e}")))?;
        Ok(())
    }

    async fn delete_profile(&self, user_id: i64) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "DELETE FROM players WHERE telegram_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_profile failed: {e}")))?;
        Ok(())
    }

    async fn list_active_by_skill(
        &self,
        skill: SkillLevel,
        excluding_user_id: i64,
    ) -> Result<Vec<PlayerProfile>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {PLAYER_COLUMNS} FROM players
                     WHERE telegram_id != ?1 AND skill_level = ?2 AND active = 1
                     ORDER BY telegram_id"
                ),
                params![excluding_user_id, skill.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_active_by_skill failed: {e}")))?;

        let mut profiles = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            profiles.push(row_to_profile(&row)?);
        }
        Ok(profiles)
    }
}
