//! Inbound classification: slash commands and callback payloads.
//!
//! Callback payloads are decoded once at the boundary into a tagged
//! [`CallbackAction`] so the engine never string-matches prefixes. Unknown
//! payloads decode to `None` and are dropped — they are stale-keyboard race
//! artifacts, not faults.

use crate::catalog::SkillLevel;

/// A typed slash command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Cancel,
    MyStatus,
    Remove,
    Update,
    Help,
}

impl Command {
    /// Exact-match a message text against the fixed command set.
    ///
    /// A `@botname` suffix (group-chat form) is stripped first. Anything
    /// that isn't one of the six commands is ignored.
    pub fn parse(text: &str) -> Option<Command> {
        let text = text.trim();
        let command = match text.split_once('@') {
            Some((cmd, _)) => cmd,
            None => text,
        };

        match command {
            "/start" => Some(Self::Start),
            "/cancel" => Some(Self::Cancel),
            "/mystatus" => Some(Self::MyStatus),
            "/remove" => Some(Self::Remove),
            "/update" => Some(Self::Update),
            "/help" => Some(Self::Help),
            _ => None,
        }
    }
}

/// A decoded button-press payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    ConsentYes,
    ConsentNo,
    /// Skill pick in the signup flow (`skill_<level>`).
    PickSkill(SkillLevel),
    /// Skill pick in the update flow (`newskill_<level>`) — commits directly.
    PickNewSkill(SkillLevel),
    /// Day membership toggle; index into [`crate::catalog::Day::ALL`].
    ToggleDay(usize),
    ConfirmDays,
    /// Slot toggle; `day_index` indexes the session's selected days.
    ToggleSlot { day_index: usize, slot: String },
    NextDay,
    PrevDay,
    FinishAvailability,
    UpdateSkill,
    UpdateDays,
    UpdatePause,
    UpdateResume,
    UpdateCancel,
    ConfirmRemove,
    CancelRemove,
}

impl CallbackAction {
    /// Decode a raw callback payload. Returns `None` for anything outside
    /// the known families.
    pub fn parse(payload: &str) -> Option<CallbackAction> {
        match payload {
            "consent_yes" => return Some(Self::ConsentYes),
            "consent_no" => return Some(Self::ConsentNo),
            "confirm_days" => return Some(Self::ConfirmDays),
            "next_day" => return Some(Self::NextDay),
            "prev_day" => return Some(Self::PrevDay),
            "finish_availability" => return Some(Self::FinishAvailability),
            "update_skill" => return Some(Self::UpdateSkill),
            "update_days" => return Some(Self::UpdateDays),
            "update_pause" => return Some(Self::UpdatePause),
            "update_resume" => return Some(Self::UpdateResume),
            "update_cancel" => return Some(Self::UpdateCancel),
            "confirm_remove" => return Some(Self::ConfirmRemove),
            "cancel_remove" => return Some(Self::CancelRemove),
            _ => {}
        }

        if let Some(level) = payload.strip_prefix("skill_") {
            return level.parse().ok().map(Self::PickSkill);
        }
        if let Some(level) = payload.strip_prefix("newskill_") {
            return level.parse().ok().map(Self::PickNewSkill);
        }
        if let Some(index) = payload.strip_prefix("toggle_day_") {
            return index.parse().ok().map(Self::ToggleDay);
        }
        if let Some(rest) = payload.strip_prefix("slot_") {
            // slot_<dayIndex>_<label>; the label may contain further `_`s.
            let (index, slot) = rest.split_once('_')?;
            let day_index = index.parse().ok()?;
            if slot.is_empty() {
                return None;
            }
            return Some(Self::ToggleSlot {
                day_index,
                slot: slot.to_string(),
            });
        }

        None
    }
}
