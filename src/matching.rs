//! Availability-matching engine.
//!
//! A match is a pair of active profiles with equal skill level and at least
//! one shared slot. No tolerance, no ranking, no cap: every qualifying
//! candidate is returned. A storage failure while scanning yields an empty
//! match list so the enclosing profile save still succeeds.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::catalog::{SkillLevel, display_slot};
use crate::channels::{Messenger, SendOptions};
use crate::flow::keyboards::display_name;
use crate::store::Database;

/// One qualifying candidate for a freshly saved profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEntry {
    pub telegram_id: i64,
    pub username: Option<String>,
    /// Intersection of both availability sets, in the requester's
    /// (sorted) slot order. Never empty.
    pub shared_slots: Vec<String>,
}

/// Scan all other active profiles at the same skill level and keep those
/// with a non-empty availability intersection.
///
/// Candidate order follows the store's `telegram_id` ordering. A scan
/// failure is logged and degrades to no matches — deliberately decoupled
/// from the save that triggered it.
pub async fn find_matches(
    db: &dyn Database,
    user_id: i64,
    skill: SkillLevel,
    availability: &BTreeSet<String>,
) -> Vec<MatchEntry> {
    let candidates = match db.list_active_by_skill(skill, user_id).await {
        Ok(candidates) => candidates,
        Err(e) => {
            tracing::warn!(user_id, %skill, "Match scan failed: {e}");
            return Vec::new();
        }
    };

    candidates
        .into_iter()
        .filter_map(|candidate| {
            let shared_slots: Vec<String> = availability
                .iter()
                .filter(|slot| candidate.availability.contains(*slot))
                .cloned()
                .collect();

            if shared_slots.is_empty() {
                return None;
            }
            Some(MatchEntry {
                telegram_id: candidate.telegram_id,
                username: candidate.username,
                shared_slots,
            })
        })
        .collect()
}

/// Notify every matched party (best-effort, per-recipient isolation) and
/// send the requester one summary listing all matches.
pub async fn notify_matches(
    messenger: &Arc<dyn Messenger>,
    chat_id: i64,
    user_id: i64,
    username: Option<&str>,
    matches: &[MatchEntry],
) {
    let requester = display_name(username, user_id);
    let mut summary = format!(
        "🎾 Great news! Found {} player(s) matching your level and schedule:\n\n",
        matches.len()
    );

    for entry in matches {
        let slots: Vec<String> = entry.shared_slots.iter().map(|s| display_slot(s)).collect();
        let slots = slots.join(", ");
        let matched = display_name(entry.username.as_deref(), entry.telegram_id);

        summary.push_str(&format!("👤 {matched}\n📅 Available: {slots}\n\n"));

        let notification = format!(
            "🎾 New match found!\n\n👤 {requester} matches your skill level and is available:\n📅 {slots}\n\nReach out to coordinate your game!"
        );

        // A user's id doubles as their private chat id. One unreachable
        // recipient must not abort the rest.
        if let Err(e) = messenger
            .send_message(entry.telegram_id, &notification, SendOptions::default())
            .await
        {
            tracing::warn!(recipient = entry.telegram_id, "Failed to notify match: {e}");
        }
    }

    summary.push_str("Reach out to them to coordinate your games!");
    if let Err(e) = messenger
        .send_message(chat_id, &summary, SendOptions::default())
        .await
    {
        tracing::warn!(chat_id, "Failed to send match summary: {e}");
    }
}
