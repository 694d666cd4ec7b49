//! Inline keyboard builders and display formatting.
//!
//! Every keyboard is rebuilt deterministically from session state alone —
//! the rendered UI is never the source of truth for a selection.

use crate::catalog::{Day, SkillLevel, split_slot_key};
use crate::channels::{InlineButton, InlineKeyboard};
use crate::model::Session;

/// Yes/No consent prompt.
pub fn consent_keyboard() -> InlineKeyboard {
    InlineKeyboard::new(vec![vec![
        InlineButton::new("✅ Yes, I agree", "consent_yes"),
        InlineButton::new("❌ No, thanks", "consent_no"),
    ]])
}

/// One stacked button per skill level. The update flow uses the
/// `newskill_` payload family so a pick commits directly.
pub fn skill_keyboard(is_update: bool) -> InlineKeyboard {
    let prefix = if is_update { "newskill_" } else { "skill_" };
    let rows = SkillLevel::ALL
        .iter()
        .map(|level| {
            vec![InlineButton::new(
                level.label(),
                format!("{prefix}{}", level.as_str()),
            )]
        })
        .collect();
    InlineKeyboard::new(rows)
}

/// Day picker: Mon–Thu row, Fri–Sun row, Continue row. Selected days get a
/// check-mark prefix.
pub fn day_selection_keyboard(selected_days: &[Day]) -> InlineKeyboard {
    let button = |day: &Day| {
        let text = if selected_days.contains(day) {
            format!("✅ {}", day.short_name())
        } else {
            day.short_name().to_string()
        };
        InlineButton::new(text, format!("toggle_day_{}", day.index()))
    };

    InlineKeyboard::new(vec![
        Day::ALL[..4].iter().map(button).collect(),
        Day::ALL[4..].iter().map(button).collect(),
        vec![InlineButton::new("Continue ➡️", "confirm_days")],
    ])
}

/// Slot picker for the day at `day_index`: the day's catalog two slots per
/// row, then a navigation row (Previous unless on the first day; Next while
/// days remain, else Finish).
pub fn availability_keyboard(session: &Session, day_index: usize, day: Day) -> InlineKeyboard {
    let mut rows: Vec<Vec<InlineButton>> = Vec::new();

    for pair in day.slots().chunks(2) {
        let row = pair
            .iter()
            .map(|slot| {
                let key = crate::catalog::slot_key(day, slot);
                let text = if session.availability.contains(&key) {
                    format!("✅ {slot}")
                } else {
                    slot.to_string()
                };
                InlineButton::new(text, format!("slot_{day_index}_{slot}"))
            })
            .collect();
        rows.push(row);
    }

    let mut nav = Vec::new();
    if day_index > 0 {
        nav.push(InlineButton::new("⬅️ Previous", "prev_day"));
    }
    if day_index + 1 < session.selected_days.len() {
        nav.push(InlineButton::new("Next ➡️", "next_day"));
    } else {
        nav.push(InlineButton::new("✅ Finish", "finish_availability"));
    }
    rows.push(nav);

    InlineKeyboard::new(rows)
}

/// Update menu; the pause/resume row reflects the profile's active flag.
pub fn update_menu_keyboard(active: bool) -> InlineKeyboard {
    let pause_resume = if active {
        InlineButton::new("⏸️ Pause Matching", "update_pause")
    } else {
        InlineButton::new("▶️ Resume Matching", "update_resume")
    };

    InlineKeyboard::new(vec![
        vec![InlineButton::new("🎯 Change Skill Level", "update_skill")],
        vec![InlineButton::new("📅 Update Availability", "update_days")],
        vec![pause_resume],
        vec![InlineButton::new("❌ Cancel", "update_cancel")],
    ])
}

/// Confirmation gate for `/remove`.
pub fn remove_confirm_keyboard() -> InlineKeyboard {
    InlineKeyboard::new(vec![vec![
        InlineButton::new("🗑️ Yes, delete my data", "confirm_remove"),
        InlineButton::new("❌ Cancel", "cancel_remove"),
    ]])
}

// ── Display helpers ─────────────────────────────────────────────────

/// `@username`, or an anonymous `Player NNNN` handle from the last four
/// digits of the Telegram id.
pub fn display_name(username: Option<&str>, telegram_id: i64) -> String {
    match username {
        Some(name) if !name.is_empty() => format!("@{name}"),
        _ => {
            let digits = telegram_id.to_string();
            let tail = &digits[digits.len().saturating_sub(4)..];
            format!("Player {tail}")
        }
    }
}

/// Group slot keys by day in catalog order for the status view:
/// `Monday: 7-9am, 9-11am` lines.
pub fn format_availability_by_day<'a, I>(keys: I) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    let keys: Vec<&String> = keys.into_iter().collect();
    let mut lines = Vec::new();

    for day in Day::ALL {
        let times: Vec<&str> = keys
            .iter()
            .filter_map(|key| {
                let (key_day, time) = split_slot_key(key);
                (key_day == day.name()).then_some(time)
            })
            .collect();
        if !times.is_empty() {
            lines.push(format!("{}: {}", day.name(), times.join(", ")));
        }
    }

    lines.join("\n")
}
