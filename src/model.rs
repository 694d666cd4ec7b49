//! Session and player profile data models.
//!
//! A `Session` is the ephemeral per-user draft for an in-progress signup or
//! update flow, stored as an opaque JSON blob in the session store. A
//! `PlayerProfile` is the durable record the matching engine scans. The
//! profile is committed wholesale only when the flow reaches its terminal
//! save transition.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::{Day, SkillLevel};

/// The step an in-progress flow is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStep {
    Consent,
    SkillLevel,
    UpdateMenu,
    UpdateSkill,
    SelectDays,
    Availability,
}

/// Ephemeral per-user draft state for a signup or update flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub step: FlowStep,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<SkillLevel>,
    /// Days picked in the day-selection step. Insertion order is preserved
    /// because the availability sub-flow walks them by index.
    #[serde(default)]
    pub selected_days: Vec<Day>,
    /// Index into `selected_days` for the availability sub-flow.
    #[serde(default)]
    pub current_day_index: usize,
    /// Composite `Day_slot` keys, e.g. `Monday_7-9am`.
    #[serde(default)]
    pub availability: BTreeSet<String>,
}

impl Session {
    /// Fresh draft for a new signup, starting at the consent step.
    pub fn new_signup(username: Option<String>) -> Self {
        Self {
            step: FlowStep::Consent,
            username,
            skill: None,
            selected_days: Vec::new(),
            current_day_index: 0,
            availability: BTreeSet::new(),
        }
    }

    /// Draft for updating an existing profile. The current skill is carried
    /// over so a days-only update can still commit a complete profile.
    pub fn new_update(username: Option<String>, skill: SkillLevel) -> Self {
        Self {
            step: FlowStep::UpdateMenu,
            username,
            skill: Some(skill),
            selected_days: Vec::new(),
            current_day_index: 0,
            availability: BTreeSet::new(),
        }
    }

    /// Toggle a day's membership: present → removed, absent → appended.
    pub fn toggle_day(&mut self, day: Day) {
        if let Some(pos) = self.selected_days.iter().position(|d| *d == day) {
            self.selected_days.remove(pos);
        } else {
            self.selected_days.push(day);
        }
    }

    /// Toggle a slot key's membership in the availability set.
    pub fn toggle_slot(&mut self, key: String) {
        if !self.availability.remove(&key) {
            self.availability.insert(key);
        }
    }

    /// The day the availability sub-flow is currently collecting slots for.
    pub fn current_day(&self) -> Option<Day> {
        self.selected_days.get(self.current_day_index).copied()
    }
}

/// Durable per-user profile scanned by the matching engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerProfile {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub skill_level: SkillLevel,
    pub availability: BTreeSet<String>,
    /// Paused profiles (`active = false`) are excluded from matching but
    /// keep their data.
    pub active: bool,
}
