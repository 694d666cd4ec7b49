//! The onboarding/update state machine and direct commands.
//!
//! Every inbound event is processed to completion independently. Session
//! reads and writes are plain read-modify-write with last-write-wins —
//! overlapping events for the same user may lose a toggle, which is an
//! accepted trade-off for human tap latency. Store failures degrade to a
//! logged no-op or a generic user-facing failure; no failure can leave a
//! session in a state `/cancel` or `/start` cannot reset.

use std::sync::Arc;

use crate::catalog::{Day, slot_key};
use crate::channels::{InboundEvent, Messenger, SendOptions};
use crate::flow::dispatch::{CallbackAction, Command};
use crate::flow::keyboards;
use crate::matching;
use crate::model::{FlowStep, PlayerProfile, Session};
use crate::store::Database;

const NO_PROFILE_TEXT: &str = "You don't have a profile yet. Send /start to create one!";

const SAVE_FAILED_TEXT: &str =
    "Sorry, there was an error saving your profile. Please try again.";

const NO_MATCHES_TEXT: &str = "✅ Profile saved!\n\n\
    No matches found yet - but don't worry! Players are joining regularly.\n\n\
    💡 Tip: Adding more days or time slots increases your chances of finding a partner.\n\n\
    I'll notify you automatically when someone with matching skill and availability joins.\n\n\
    Commands:\n\
    /mystatus - View your profile\n\
    /update - Expand your availability\n\
    /remove - Delete your data";

const HELP_TEXT: &str = "🎾 *Tennis Matchmaker Bot*\n\n\
    *Commands:*\n\
    /start - Create or reset your profile\n\
    /mystatus - View your current profile\n\
    /update - Change skill level or availability\n\
    /remove - Delete all your data\n\
    /cancel - Cancel current operation\n\
    /help - Show this help message\n\n\
    *How it works:*\n\
    1. Set your skill level (beginner to pro)\n\
    2. Select days you're available\n\
    3. Pick time slots for each day\n\
    4. Get matched with players at your level!\n\n\
    When a match is found, both players are notified with each other's contact info.";

/// Drives the onboarding/update flows and direct commands against the
/// session and profile stores, dispatching replies through the messenger.
pub struct Engine {
    db: Arc<dyn Database>,
    messenger: Arc<dyn Messenger>,
}

impl Engine {
    pub fn new(db: Arc<dyn Database>, messenger: Arc<dyn Messenger>) -> Self {
        Self { db, messenger }
    }

    /// Entry point for one decoded inbound event.
    pub async fn handle_event(&self, event: InboundEvent) {
        match event {
            InboundEvent::Command {
                user_id,
                chat_id,
                username,
                text,
            } => self.handle_command(user_id, chat_id, username, &text).await,
            InboundEvent::Callback {
                user_id,
                chat_id,
                message_id,
                callback_id,
                payload,
            } => {
                self.handle_callback(user_id, chat_id, message_id, &callback_id, &payload)
                    .await
            }
        }
    }

    // ── Commands ────────────────────────────────────────────────────

    async fn handle_command(
        &self,
        user_id: i64,
        chat_id: i64,
        username: Option<String>,
        text: &str,
    ) {
        let Some(command) = Command::parse(text) else {
            // Plain chatter, not a command.
            return;
        };

        tracing::debug!(user_id, ?command, "Handling command");

        match command {
            Command::Start => self.cmd_start(user_id, chat_id, username).await,
            Command::Cancel => self.cmd_cancel(user_id, chat_id).await,
            Command::MyStatus => self.cmd_status(user_id, chat_id).await,
            Command::Remove => self.cmd_remove(chat_id).await,
            Command::Update => self.cmd_update(user_id, chat_id, username).await,
            Command::Help => {
                self.send(chat_id, HELP_TEXT, SendOptions::markdown()).await;
            }
        }
    }

    async fn cmd_start(&self, user_id: i64, chat_id: i64, username: Option<String>) {
        let session = Session::new_signup(username);
        self.store_session(user_id, &session).await;

        let mut text = String::from(
            "🎾 Welcome to the Tennis Matchmaker Bot!\n\n\
             I'll help you find tennis partners at your skill level.\n\n\
             To get started, I need your permission to share your Telegram \
             username with matched players.\n\n\
             Your data will be minimal and can be deleted anytime with /remove command.",
        );
        if session.username.is_none() {
            text.push_str(
                "\n\n⚠️ Note: You don't have a Telegram username set. Matched players \
                 won't be able to contact you directly. Consider setting one in \
                 Telegram Settings.",
            );
        }

        self.send(
            chat_id,
            &text,
            SendOptions::keyboard(keyboards::consent_keyboard()),
        )
        .await;
    }

    async fn cmd_cancel(&self, user_id: i64, chat_id: i64) {
        self.drop_session(user_id).await;
        self.send(
            chat_id,
            "Operation cancelled. Send /start when you're ready to try again.",
            SendOptions::default(),
        )
        .await;
    }

    async fn cmd_status(&self, user_id: i64, chat_id: i64) {
        let profile = match self.db.get_profile(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(user_id, "Status lookup failed: {e}");
                self.send(chat_id, "Error retrieving your profile.", SendOptions::default())
                    .await;
                return;
            }
        };

        let Some(profile) = profile else {
            self.send(chat_id, NO_PROFILE_TEXT, SendOptions::default()).await;
            return;
        };

        let availability = keyboards::format_availability_by_day(&profile.availability);
        let availability = if availability.is_empty() {
            "None set".to_string()
        } else {
            availability
        };
        let status = if profile.active { "✅ Active" } else { "⏸️ Paused" };

        let text = format!(
            "📊 Your Profile:\n\n\
             🎯 Skill Level: {}\n\
             📅 Availability:\n{availability}\n\n\
             Status: {status}\n\n\
             Commands:\n\
             /update - Modify your profile\n\
             /remove - Delete your data",
            profile.skill_level
        );
        self.send(chat_id, &text, SendOptions::default()).await;
    }

    async fn cmd_remove(&self, chat_id: i64) {
        // Destructive action is gated by the confirm callback, not session
        // state.
        self.send(
            chat_id,
            "⚠️ *Are you sure?*\n\nThis will permanently delete your profile and all your data.",
            SendOptions::markdown_keyboard(keyboards::remove_confirm_keyboard()),
        )
        .await;
    }

    async fn cmd_update(&self, user_id: i64, chat_id: i64, username: Option<String>) {
        let profile = match self.db.get_profile(user_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                self.send(chat_id, NO_PROFILE_TEXT, SendOptions::default()).await;
                return;
            }
            Err(e) => {
                tracing::warn!(user_id, "Profile lookup failed: {e}");
                self.send(chat_id, NO_PROFILE_TEXT, SendOptions::default()).await;
                return;
            }
        };

        // Carry the existing skill into the draft so a days-only update can
        // still commit a complete profile.
        let session = Session::new_update(
            username.or_else(|| profile.username.clone()),
            profile.skill_level,
        );
        self.store_session(user_id, &session).await;

        self.send(
            chat_id,
            "⚙️ What would you like to update?",
            SendOptions::keyboard(keyboards::update_menu_keyboard(profile.active)),
        )
        .await;
    }

    // ── Callbacks ───────────────────────────────────────────────────

    async fn handle_callback(
        &self,
        user_id: i64,
        chat_id: i64,
        message_id: i64,
        callback_id: &str,
        payload: &str,
    ) {
        // Clear the button's loading indicator before processing.
        if let Err(e) = self.messenger.answer_callback(callback_id).await {
            tracing::warn!(user_id, "answerCallbackQuery failed: {e}");
        }

        let Some(action) = CallbackAction::parse(payload) else {
            // Stale or foreign keyboard — a harmless race, not a fault.
            tracing::debug!(user_id, payload, "Ignoring unknown callback payload");
            return;
        };

        let mut session = self.load_session(user_id).await;

        match action {
            CallbackAction::ConsentYes => {
                session.step = FlowStep::SkillLevel;
                self.store_session(user_id, &session).await;
                self.ask_skill(chat_id, false).await;
            }
            CallbackAction::ConsentNo => {
                self.drop_session(user_id).await;
                self.send(
                    chat_id,
                    "No problem! If you change your mind, just send /start again.",
                    SendOptions::default(),
                )
                .await;
            }
            CallbackAction::PickSkill(skill) => {
                session.skill = Some(skill);
                session.step = FlowStep::SelectDays;
                self.store_session(user_id, &session).await;
                self.ask_days(chat_id, &session).await;
            }
            CallbackAction::PickNewSkill(skill) => {
                match self.db.update_skill(user_id, skill).await {
                    Ok(()) => {
                        self.drop_session(user_id).await;
                        self.send(
                            chat_id,
                            &format!("✅ Skill level updated to {skill}!"),
                            SendOptions::default(),
                        )
                        .await;
                    }
                    Err(e) => {
                        tracing::warn!(user_id, "Skill update failed: {e}");
                        self.send(chat_id, SAVE_FAILED_TEXT, SendOptions::default()).await;
                    }
                }
            }
            CallbackAction::ToggleDay(index) => {
                let Some(day) = Day::from_index(index) else {
                    return;
                };
                session.toggle_day(day);
                self.store_session(user_id, &session).await;
                self.edit(
                    chat_id,
                    message_id,
                    keyboards::day_selection_keyboard(&session.selected_days),
                )
                .await;
            }
            CallbackAction::ConfirmDays => {
                if session.selected_days.is_empty() {
                    self.send(chat_id, "⚠️ Please select at least one day.", SendOptions::default())
                        .await;
                    return;
                }
                session.step = FlowStep::Availability;
                session.current_day_index = 0;
                session.availability.clear();
                self.store_session(user_id, &session).await;
                self.ask_availability(chat_id, &session).await;
            }
            CallbackAction::ToggleSlot { day_index, slot } => {
                let Some(day) = session.selected_days.get(day_index).copied() else {
                    return;
                };
                // Only slots from this day's catalog may enter the set;
                // anything else is a stale keyboard.
                if !day.slots().contains(&slot.as_str()) {
                    return;
                }
                session.toggle_slot(slot_key(day, &slot));
                self.store_session(user_id, &session).await;
                self.edit(
                    chat_id,
                    message_id,
                    keyboards::availability_keyboard(&session, day_index, day),
                )
                .await;
            }
            CallbackAction::NextDay => {
                let next = session.current_day_index + 1;
                if next < session.selected_days.len() {
                    session.current_day_index = next;
                    self.store_session(user_id, &session).await;
                    self.ask_availability(chat_id, &session).await;
                } else {
                    self.save_profile(user_id, chat_id, &session).await;
                }
            }
            CallbackAction::PrevDay => {
                if session.current_day_index > 0 {
                    session.current_day_index -= 1;
                    self.store_session(user_id, &session).await;
                    self.ask_availability(chat_id, &session).await;
                }
            }
            CallbackAction::FinishAvailability => {
                self.save_profile(user_id, chat_id, &session).await;
            }
            CallbackAction::UpdateSkill => {
                session.step = FlowStep::UpdateSkill;
                self.store_session(user_id, &session).await;
                self.ask_skill(chat_id, true).await;
            }
            CallbackAction::UpdateDays => {
                session.step = FlowStep::SelectDays;
                session.selected_days.clear();
                session.availability.clear();
                self.store_session(user_id, &session).await;
                self.ask_days(chat_id, &session).await;
            }
            CallbackAction::UpdatePause => {
                self.flip_active(user_id, chat_id, false).await;
            }
            CallbackAction::UpdateResume => {
                self.flip_active(user_id, chat_id, true).await;
            }
            CallbackAction::UpdateCancel => {
                self.drop_session(user_id).await;
                self.send(chat_id, "Update cancelled.", SendOptions::default()).await;
            }
            CallbackAction::ConfirmRemove => {
                self.execute_remove(user_id, chat_id).await;
            }
            CallbackAction::CancelRemove => {
                self.send(
                    chat_id,
                    "Removal cancelled. Your data is safe.",
                    SendOptions::default(),
                )
                .await;
            }
        }
    }

    // ── Flow prompts ────────────────────────────────────────────────

    async fn ask_skill(&self, chat_id: i64, is_update: bool) {
        self.send(
            chat_id,
            "🎯 What's your playing level?\n\nChoose the one that best describes your current skill:",
            SendOptions::keyboard(keyboards::skill_keyboard(is_update)),
        )
        .await;
    }

    async fn ask_days(&self, chat_id: i64, session: &Session) {
        self.send(
            chat_id,
            "📅 Which days are you typically available to play?\n\n\
             Tap to select/deselect days, then press Continue.",
            SendOptions::keyboard(keyboards::day_selection_keyboard(&session.selected_days)),
        )
        .await;
    }

    async fn ask_availability(&self, chat_id: i64, session: &Session) {
        let Some(day) = session.current_day() else {
            tracing::warn!("Availability prompt without a current day");
            return;
        };

        let text = format!(
            "📅 Select time slots for *{day}* ({}/{}):\n\n\
             Tap slots when you're available. Selected slots show ✅",
            session.current_day_index + 1,
            session.selected_days.len(),
        );
        self.send(
            chat_id,
            &text,
            SendOptions::markdown_keyboard(keyboards::availability_keyboard(
                session,
                session.current_day_index,
                day,
            )),
        )
        .await;
    }

    // ── Terminal transitions ────────────────────────────────────────

    /// Commit the draft as the durable profile and run matching.
    ///
    /// Matching is decoupled from the save: a failed scan still leaves the
    /// profile persisted and the session cleared.
    async fn save_profile(&self, user_id: i64, chat_id: i64, session: &Session) {
        // A degraded (recreated) session may have lost its skill pick.
        let Some(skill) = session.skill else {
            tracing::warn!(user_id, "Save attempted without a skill level");
            self.send(chat_id, SAVE_FAILED_TEXT, SendOptions::default()).await;
            return;
        };

        let profile = PlayerProfile {
            telegram_id: user_id,
            username: session.username.clone(),
            skill_level: skill,
            availability: session.availability.clone(),
            active: true,
        };

        if let Err(e) = self.db.upsert_profile(&profile).await {
            tracing::warn!(user_id, "Profile save failed: {e}");
            self.send(chat_id, SAVE_FAILED_TEXT, SendOptions::default()).await;
            return;
        }
        tracing::info!(user_id, skill = %skill, slots = profile.availability.len(), "Profile saved");

        let matches = matching::find_matches(&*self.db, user_id, skill, &profile.availability).await;
        if matches.is_empty() {
            self.send(chat_id, NO_MATCHES_TEXT, SendOptions::default()).await;
        } else {
            matching::notify_matches(
                &self.messenger,
                chat_id,
                user_id,
                session.username.as_deref(),
                &matches,
            )
            .await;
        }

        self.drop_session(user_id).await;
    }

    async fn flip_active(&self, user_id: i64, chat_id: i64, active: bool) {
        if let Err(e) = self.db.set_active(user_id, active).await {
            tracing::warn!(user_id, active, "Active flag update failed: {e}");
            self.send(chat_id, SAVE_FAILED_TEXT, SendOptions::default()).await;
            return;
        }
        self.drop_session(user_id).await;

        let text = if active {
            "▶️ Matching resumed! You'll now receive notifications for new matches."
        } else {
            "⏸️ Matching paused. You won't receive new match notifications.\n\n\
             Send /update to resume anytime."
        };
        self.send(chat_id, text, SendOptions::default()).await;
    }

    async fn execute_remove(&self, user_id: i64, chat_id: i64) {
        let removed = self.db.delete_profile(user_id).await;
        let session_removed = self.db.delete_session(user_id).await;

        match (removed, session_removed) {
            (Ok(()), Ok(())) => {
                self.send(
                    chat_id,
                    "✅ Your data has been completely removed from our system.",
                    SendOptions::default(),
                )
                .await;
            }
            (profile, session) => {
                if let Err(e) = profile {
                    tracing::warn!(user_id, "Profile removal failed: {e}");
                }
                if let Err(e) = session {
                    tracing::warn!(user_id, "Session removal failed: {e}");
                }
                self.send(
                    chat_id,
                    "Error removing your data. Please try again.",
                    SendOptions::default(),
                )
                .await;
            }
        }
    }

    // ── Store and send helpers ──────────────────────────────────────

    /// Load the user's draft; a miss or store failure degrades to an empty
    /// draft rather than an error (the flow fails later at save if required
    /// fields are missing).
    async fn load_session(&self, user_id: i64) -> Session {
        match self.db.get_session(user_id).await {
            Ok(Some(session)) => session,
            Ok(None) => Session::new_signup(None),
            Err(e) => {
                tracing::warn!(user_id, "Session load failed: {e}");
                Session::new_signup(None)
            }
        }
    }

    async fn store_session(&self, user_id: i64, session: &Session) {
        if let Err(e) = self.db.set_session(user_id, session).await {
            tracing::warn!(user_id, step = ?session.step, "Session write failed: {e}");
        }
    }

    async fn drop_session(&self, user_id: i64) {
        if let Err(e) = self.db.delete_session(user_id).await {
            tracing::warn!(user_id, "Session delete failed: {e}");
        }
    }

    async fn send(&self, chat_id: i64, text: &str, options: SendOptions) {
        if let Err(e) = self.messenger.send_message(chat_id, text, options).await {
            tracing::warn!(chat_id, "Send failed: {e}");
        }
    }

    async fn edit(&self, chat_id: i64, message_id: i64, keyboard: crate::channels::InlineKeyboard) {
        if let Err(e) = self.messenger.edit_keyboard(chat_id, message_id, keyboard).await {
            tracing::warn!(chat_id, message_id, "Keyboard edit failed: {e}");
        }
    }
}
