//! Integration tests for the onboarding/update flows and matching.
//!
//! Each test drives the real `Engine` against an in-memory libSQL database
//! and a recording `Messenger` stub, feeding it the same decoded events the
//! Telegram poller would produce.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use matchpoint::catalog::SkillLevel;
use matchpoint::channels::{InboundEvent, InlineKeyboard, Messenger, SendOptions};
use matchpoint::error::{ChannelError, DatabaseError};
use matchpoint::flow::Engine;
use matchpoint::model::{FlowStep, PlayerProfile, Session};
use matchpoint::store::{Database, LibSqlBackend};

/// Messenger stub that records outbound traffic instead of hitting the
/// Bot API.
#[derive(Default)]
struct RecordingMessenger {
    sent: Mutex<Vec<(i64, String)>>,
    edits: Mutex<Vec<(i64, i64)>>,
    answered: Mutex<Vec<String>>,
}

impl RecordingMessenger {
    /// All message texts sent to one chat, in order.
    fn texts_for(&self, chat_id: i64) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(chat, _)| *chat == chat_id)
            .map(|(_, text)| text.clone())
            .collect()
    }

    fn last_text_for(&self, chat_id: i64) -> String {
        self.texts_for(chat_id).last().cloned().unwrap_or_default()
    }

    fn edit_count(&self) -> usize {
        self.edits.lock().unwrap().len()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        _options: SendOptions,
    ) -> Result<(), ChannelError> {
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn edit_keyboard(
        &self,
        chat_id: i64,
        message_id: i64,
        _keyboard: InlineKeyboard,
    ) -> Result<(), ChannelError> {
        self.edits.lock().unwrap().push((chat_id, message_id));
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), ChannelError> {
        self.answered.lock().unwrap().push(callback_id.to_string());
        Ok(())
    }
}

/// Database wrapper whose match scan always fails, for verifying the
/// save-matching decoupling.
struct FailingScanDb {
    inner: LibSqlBackend,
}

#[async_trait]
impl Database for FailingScanDb {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        self.inner.run_migrations().await
    }
    async fn get_session(&self, user_id: i64) -> Result<Option<Session>, DatabaseError> {
        self.inner.get_session(user_id).await
    }
    async fn set_session(&self, user_id: i64, session: &Session) -> Result<(), DatabaseError> {
        self.inner.set_session(user_id, session).await
    }
    async fn delete_session(&self, user_id: i64) -> Result<(), DatabaseError> {
        self.inner.delete_session(user_id).await
    }
    async fn upsert_profile(&self, profile: &PlayerProfile) -> Result<(), DatabaseError> {
        self.inner.upsert_profile(profile).await
    }
    async fn get_profile(&self, user_id: i64) -> Result<Option<PlayerProfile>, DatabaseError> {
        self.inner.get_profile(user_id).await
    }
    async fn set_active(&self, user_id: i64, active: bool) -> Result<(), DatabaseError> {
        self.inner.set_active(user_id, active).await
    }
    async fn update_skill(&self, user_id: i64, skill: SkillLevel) -> Result<(), DatabaseError> {
        self.inner.update_skill(user_id, skill).await
    }
    async fn update_availability(
        &self,
        user_id: i64,
        availability: &BTreeSet<String>,
    ) -> Result<(), DatabaseError> {
        self.inner.update_availability(user_id, availability).await
    }
    async fn delete_profile(&self, user_id: i64) -> Result<(), DatabaseError> {
        self.inner.delete_profile(user_id).await
    }
    async fn list_active_by_skill(
        &self,
        _skill: SkillLevel,
        _excluding_user_id: i64,
    ) -> Result<Vec<PlayerProfile>, DatabaseError> {
        Err(DatabaseError::Query("scan unavailable".into()))
    }
}

// ── Test harness ────────────────────────────────────────────────────

struct Harness {
    db: Arc<dyn Database>,
    messenger: Arc<RecordingMessenger>,
    engine: Engine,
}

impl Harness {
    async fn new() -> Self {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        Self::with_db(db)
    }

    fn with_db(db: Arc<dyn Database>) -> Self {
        let messenger = Arc::new(RecordingMessenger::default());
        let engine = Engine::new(
            Arc::clone(&db),
            Arc::clone(&messenger) as Arc<dyn Messenger>,
        );
        Self {
            db,
            messenger,
            engine,
        }
    }

    async fn command(&self, user_id: i64, text: &str) {
        self.engine
            .handle_event(InboundEvent::Command {
                user_id,
                chat_id: user_id,
                username: Some(format!("user{user_id}")),
                text: text.to_string(),
            })
            .await;
    }

    async fn callback(&self, user_id: i64, payload: &str) {
        self.engine
            .handle_event(InboundEvent::Callback {
                user_id,
                chat_id: user_id,
                message_id: 100,
                callback_id: format!("cb-{payload}"),
                payload: payload.to_string(),
            })
            .await;
    }

    /// Drive a full signup: consent, skill, Monday + Wednesday, one slot
    /// each.
    async fn signup_medium_mon_wed(&self, user_id: i64) {
        self.command(user_id, "/start").await;
        self.callback(user_id, "consent_yes").await;
        self.callback(user_id, "skill_medium").await;
        self.callback(user_id, "toggle_day_0").await; // Monday
        self.callback(user_id, "toggle_day_2").await; // Wednesday
        self.callback(user_id, "confirm_days").await;
        self.callback(user_id, "slot_0_7-9am").await;
        self.callback(user_id, "next_day").await;
        self.callback(user_id, "slot_1_1-3pm").await;
        self.callback(user_id, "next_day").await; // last day → save
    }
}

fn keys(slots: &[&str]) -> BTreeSet<String> {
    slots.iter().map(|s| s.to_string()).collect()
}

// ── Signup flow ─────────────────────────────────────────────────────

#[tokio::test]
async fn full_signup_persists_profile_and_clears_session() {
    let h = Harness::new().await;
    h.signup_medium_mon_wed(1).await;

    let profile = h.db.get_profile(1).await.unwrap().unwrap();
    assert_eq!(profile.skill_level, SkillLevel::Medium);
    assert_eq!(profile.availability, keys(&["Monday_7-9am", "Wednesday_1-3pm"]));
    assert!(profile.active);
    assert_eq!(profile.username.as_deref(), Some("user1"));

    assert!(h.db.get_session(1).await.unwrap().is_none());
    assert!(h.messenger.last_text_for(1).contains("No matches found yet"));
    // Each toggle edited the keyboard in place.
    assert_eq!(h.messenger.edit_count(), 4);
}

#[tokio::test]
async fn consent_refusal_destroys_session() {
    let h = Harness::new().await;
    h.command(1, "/start").await;
    assert!(h.db.get_session(1).await.unwrap().is_some());

    h.callback(1, "consent_no").await;
    assert!(h.db.get_session(1).await.unwrap().is_none());
    assert!(h.messenger.last_text_for(1).contains("change your mind"));
}

#[tokio::test]
async fn confirming_empty_day_selection_never_advances() {
    let h = Harness::new().await;
    h.command(1, "/start").await;
    h.callback(1, "consent_yes").await;
    h.callback(1, "skill_medium").await;
    h.callback(1, "confirm_days").await;

    assert!(h.messenger.last_text_for(1).contains("at least one day"));
    let session = h.db.get_session(1).await.unwrap().unwrap();
    // Still in day selection; the availability sub-flow was not entered.
    assert!(session.availability.is_empty());
    assert_eq!(session.current_day_index, 0);
    assert_eq!(session.step, FlowStep::SelectDays);
}

#[tokio::test]
async fn saturday_uses_weekend_catalog() {
    let h = Harness::new().await;
    h.command(1, "/start").await;
    h.callback(1, "consent_yes").await;
    h.callback(1, "skill_pro").await;
    h.callback(1, "toggle_day_5").await; // Saturday
    h.callback(1, "confirm_days").await;

    // A weekday-only label is rejected for a weekend day.
    h.callback(1, "slot_0_7-9am").await;
    let session = h.db.get_session(1).await.unwrap().unwrap();
    assert!(session.availability.is_empty());

    h.callback(1, "slot_0_8-10am").await;
    h.callback(1, "finish_availability").await;

    let profile = h.db.get_profile(1).await.unwrap().unwrap();
    assert_eq!(profile.availability, keys(&["Saturday_8-10am"]));
}

#[tokio::test]
async fn toggling_twice_restores_selection() {
    let h = Harness::new().await;
    h.command(1, "/start").await;
    h.callback(1, "consent_yes").await;
    h.callback(1, "skill_medium").await;
    h.callback(1, "toggle_day_0").await;
    h.callback(1, "toggle_day_0").await;

    let session = h.db.get_session(1).await.unwrap().unwrap();
    assert!(session.selected_days.is_empty());
}

#[tokio::test]
async fn prev_day_is_noop_on_first_day() {
    let h = Harness::new().await;
    h.command(1, "/start").await;
    h.callback(1, "consent_yes").await;
    h.callback(1, "skill_medium").await;
    h.callback(1, "toggle_day_0").await;
    h.callback(1, "toggle_day_1").await;
    h.callback(1, "confirm_days").await;

    h.callback(1, "prev_day").await;
    let session = h.db.get_session(1).await.unwrap().unwrap();
    assert_eq!(session.current_day_index, 0);

    h.callback(1, "next_day").await;
    h.callback(1, "prev_day").await;
    let session = h.db.get_session(1).await.unwrap().unwrap();
    assert_eq!(session.current_day_index, 0);
}

#[tokio::test]
async fn unknown_payload_is_silently_ignored() {
    let h = Harness::new().await;
    h.command(1, "/start").await;
    let before = h.messenger.texts_for(1).len();

    h.callback(1, "quick_weekend_all").await;
    h.callback(1, "garbage").await;

    // Nothing sent, nothing edited, session untouched.
    assert_eq!(h.messenger.texts_for(1).len(), before);
    assert_eq!(h.messenger.edit_count(), 0);
    let session = h.db.get_session(1).await.unwrap().unwrap();
    assert_eq!(session.step, FlowStep::Consent);
}

#[tokio::test]
async fn cancel_clears_mid_flow_session() {
    let h = Harness::new().await;
    h.command(1, "/start").await;
    h.callback(1, "consent_yes").await;
    h.command(1, "/cancel").await;

    assert!(h.db.get_session(1).await.unwrap().is_none());
    assert!(h.db.get_profile(1).await.unwrap().is_none());
}

// ── Matching ────────────────────────────────────────────────────────

#[tokio::test]
async fn save_notifies_both_sides_of_a_match() {
    let h = Harness::new().await;

    // An existing active medium player, Monday morning only.
    h.db.upsert_profile(&PlayerProfile {
        telegram_id: 2,
        username: Some("bob".into()),
        skill_level: SkillLevel::Medium,
        availability: keys(&["Monday_7-9am"]),
        active: true,
    })
    .await
    .unwrap();

    h.signup_medium_mon_wed(1).await;

    // Exactly one notification to the matched party...
    let to_bob = h.messenger.texts_for(2);
    assert_eq!(to_bob.len(), 1);
    assert!(to_bob[0].contains("New match found"));
    assert!(to_bob[0].contains("@user1"));
    assert!(to_bob[0].contains("Monday 7-9am"));
    assert!(!to_bob[0].contains("Wednesday"));

    // ...and one summary back to the requester.
    let summary = h.messenger.last_text_for(1);
    assert!(summary.contains("Found 1 player(s)"));
    assert!(summary.contains("@bob"));
    assert!(summary.contains("Monday 7-9am"));
}

#[tokio::test]
async fn different_skill_with_overlap_never_matches() {
    let h = Harness::new().await;
    h.db.upsert_profile(&PlayerProfile {
        telegram_id: 2,
        username: Some("bob".into()),
        skill_level: SkillLevel::Advanced,
        availability: keys(&["Monday_7-9am"]),
        active: true,
    })
    .await
    .unwrap();

    h.signup_medium_mon_wed(1).await;

    assert!(h.messenger.texts_for(2).is_empty());
    assert!(h.messenger.last_text_for(1).contains("No matches found yet"));
}

#[tokio::test]
async fn paused_profile_is_never_a_candidate() {
    let h = Harness::new().await;
    h.db.upsert_profile(&PlayerProfile {
        telegram_id: 2,
        username: Some("bob".into()),
        skill_level: SkillLevel::Medium,
        availability: keys(&["Monday_7-9am", "Wednesday_1-3pm"]),
        active: false,
    })
    .await
    .unwrap();

    h.signup_medium_mon_wed(1).await;

    assert!(h.messenger.texts_for(2).is_empty());
    assert!(h.messenger.last_text_for(1).contains("No matches found yet"));
}

#[tokio::test]
async fn failed_match_scan_still_persists_the_save() {
    let inner = LibSqlBackend::new_memory().await.unwrap();
    let db: Arc<dyn Database> = Arc::new(FailingScanDb { inner });
    let h = Harness::with_db(db);

    h.signup_medium_mon_wed(1).await;

    // Save succeeded despite the scan failure...
    assert!(h.messenger.last_text_for(1).contains("No matches found yet"));
    assert!(h.db.get_session(1).await.unwrap().is_none());

    // ...which a status read confirms.
    h.command(1, "/mystatus").await;
    let status = h.messenger.last_text_for(1);
    assert!(status.contains("medium"));
    assert!(status.contains("Monday: 7-9am"));
}

// ── Direct commands ─────────────────────────────────────────────────

#[tokio::test]
async fn status_without_profile() {
    let h = Harness::new().await;
    h.command(1, "/mystatus").await;
    assert!(h.messenger.last_text_for(1).contains("don't have a profile yet"));
}

#[tokio::test]
async fn status_shows_grouped_availability_and_state() {
    let h = Harness::new().await;
    h.signup_medium_mon_wed(1).await;
    h.command(1, "/mystatus").await;

    let status = h.messenger.last_text_for(1);
    assert!(status.contains("Skill Level: medium"));
    assert!(status.contains("Monday: 7-9am"));
    assert!(status.contains("Wednesday: 1-3pm"));
    assert!(status.contains("✅ Active"));
}

#[tokio::test]
async fn remove_then_status_reports_no_profile() {
    let h = Harness::new().await;
    h.signup_medium_mon_wed(1).await;

    h.command(1, "/remove").await;
    assert!(h.messenger.last_text_for(1).contains("Are you sure"));
    // Profile untouched until confirmed.
    assert!(h.db.get_profile(1).await.unwrap().is_some());

    h.callback(1, "confirm_remove").await;
    assert!(h.messenger.last_text_for(1).contains("completely removed"));

    h.command(1, "/mystatus").await;
    assert!(h.messenger.last_text_for(1).contains("don't have a profile yet"));
}

#[tokio::test]
async fn remove_can_be_cancelled() {
    let h = Harness::new().await;
    h.signup_medium_mon_wed(1).await;

    h.command(1, "/remove").await;
    h.callback(1, "cancel_remove").await;

    assert!(h.messenger.last_text_for(1).contains("your data is safe"));
    assert!(h.db.get_profile(1).await.unwrap().is_some());
}

#[tokio::test]
async fn non_command_text_is_ignored() {
    let h = Harness::new().await;
    h.command(1, "hello there").await;
    assert!(h.messenger.texts_for(1).is_empty());
}

// ── Update flow ─────────────────────────────────────────────────────

#[tokio::test]
async fn update_without_profile_prompts_start() {
    let h = Harness::new().await;
    h.command(1, "/update").await;
    assert!(h.messenger.last_text_for(1).contains("don't have a profile yet"));
    assert!(h.db.get_session(1).await.unwrap().is_none());
}

#[tokio::test]
async fn update_skill_commits_directly_and_ends_session() {
    let h = Harness::new().await;
    h.signup_medium_mon_wed(1).await;

    h.command(1, "/update").await;
    h.callback(1, "update_skill").await;
    h.callback(1, "newskill_advanced").await;

    let profile = h.db.get_profile(1).await.unwrap().unwrap();
    assert_eq!(profile.skill_level, SkillLevel::Advanced);
    // Availability untouched by a skill-only update.
    assert_eq!(profile.availability, keys(&["Monday_7-9am", "Wednesday_1-3pm"]));
    assert!(h.db.get_session(1).await.unwrap().is_none());
    assert!(h.messenger.last_text_for(1).contains("updated to advanced"));
}

#[tokio::test]
async fn update_days_rebuilds_availability_keeping_skill() {
    let h = Harness::new().await;
    h.signup_medium_mon_wed(1).await;

    h.command(1, "/update").await;
    h.callback(1, "update_days").await;
    h.callback(1, "toggle_day_4").await; // Friday
    h.callback(1, "confirm_days").await;
    h.callback(1, "slot_0_5-7pm").await;
    h.callback(1, "finish_availability").await;

    let profile = h.db.get_profile(1).await.unwrap().unwrap();
    assert_eq!(profile.skill_level, SkillLevel::Medium);
    assert_eq!(profile.availability, keys(&["Friday_5-7pm"]));
    assert!(h.db.get_session(1).await.unwrap().is_none());
}

#[tokio::test]
async fn pause_and_resume_flip_the_active_flag() {
    let h = Harness::new().await;
    h.signup_medium_mon_wed(1).await;

    h.command(1, "/update").await;
    h.callback(1, "update_pause").await;
    assert!(!h.db.get_profile(1).await.unwrap().unwrap().active);
    assert!(h.db.get_session(1).await.unwrap().is_none());
    assert!(h.messenger.last_text_for(1).contains("Matching paused"));

    h.command(1, "/update").await;
    h.callback(1, "update_resume").await;
    assert!(h.db.get_profile(1).await.unwrap().unwrap().active);
    assert!(h.messenger.last_text_for(1).contains("Matching resumed"));
}

#[tokio::test]
async fn update_cancel_keeps_profile_intact() {
    let h = Harness::new().await;
    h.signup_medium_mon_wed(1).await;
    let before = h.db.get_profile(1).await.unwrap().unwrap();

    h.command(1, "/update").await;
    h.callback(1, "update_cancel").await;

    assert_eq!(h.db.get_profile(1).await.unwrap().unwrap(), before);
    assert!(h.db.get_session(1).await.unwrap().is_none());
    assert!(h.messenger.last_text_for(1).contains("Update cancelled"));
}

// ── Degraded sessions ───────────────────────────────────────────────

#[tokio::test]
async fn finish_after_session_loss_fails_save_gracefully() {
    let h = Harness::new().await;
    h.command(1, "/start").await;
    h.callback(1, "consent_yes").await;
    // Session vanishes mid-flow (e.g. store wipe).
    h.db.delete_session(1).await.unwrap();

    h.callback(1, "finish_availability").await;

    // No skill in the degraded draft → generic failure, no profile.
    assert!(h.messenger.last_text_for(1).contains("error saving"));
    assert!(h.db.get_profile(1).await.unwrap().is_none());

    // /start still resets forward progress.
    h.command(1, "/start").await;
    assert!(h.db.get_session(1).await.unwrap().is_some());
}
