//! Unified `Database` trait — single async interface for all persistence.
//!
//! Covers the two adapter concerns the bot needs: the ephemeral session
//! store (one opaque draft blob per user) and the durable player profile
//! store. Both key rows by Telegram user id, so distinct users never
//! contend on shared state.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::catalog::SkillLevel;
use crate::error::DatabaseError;
use crate::model::{PlayerProfile, Session};

/// Backend-agnostic database trait covering sessions and profiles.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Sessions ────────────────────────────────────────────────────

    /// Load a user's in-progress flow draft, if any.
    async fn get_session(&self, user_id: i64) -> Result<Option<Session>, DatabaseError>;

    /// Upsert a user's flow draft.
    async fn set_session(&self, user_id: i64, session: &Session) -> Result<(), DatabaseError>;

    /// Delete a user's flow draft. Idempotent.
    async fn delete_session(&self, user_id: i64) -> Result<(), DatabaseError>;

    // ── Profiles ────────────────────────────────────────────────────

    /// Insert or wholesale-overwrite a player profile.
    async fn upsert_profile(&self, profile: &PlayerProfile) -> Result<(), DatabaseError>;

    /// Get a player profile by user id.
    async fn get_profile(&self, user_id: i64) -> Result<Option<PlayerProfile>, DatabaseError>;

    /// Flip the matching-participation flag without touching other fields.
    async fn set_active(&self, user_id: i64, active: bool) -> Result<(), DatabaseError>;

    /// Overwrite only the skill level.
    async fn update_skill(&self, user_id: i64, skill: SkillLevel) -> Result<(), DatabaseError>;

    /// Overwrite only the availability set.
    async fn update_availability(
        &self,
        user_id: i64,
        availability: &BTreeSet<String>,
    ) -> Result<(), DatabaseError>;

    /// Delete a player profile. Idempotent.
    async fn delete_profile(&self, user_id: i64) -> Result<(), DatabaseError>;

    /// All active profiles with the given skill level, excluding the
    /// requester, ordered by telegram_id. No cap — every candidate is
    /// returned.
    async fn list_active_by_skill(
        &self,
        skill: SkillLevel,
        excluding_user_id: i64,
    ) -> Result<Vec<PlayerProfile>, DatabaseError>;
}
