//! Fixed catalogs: skill levels, weekdays, and per-day time slots.
//!
//! None of these are configurable at runtime. The weekend catalog has
//! different slot boundaries (and one fewer slot) than the weekday one.

use serde::{Deserialize, Serialize};

/// Time slots offered Monday through Friday.
pub const WEEKDAY_SLOTS: &[&str] = &[
    "7-9am", "9-11am", "11am-1pm", "1-3pm", "3-5pm", "5-7pm", "7-9pm",
];

/// Time slots offered Saturday and Sunday.
pub const WEEKEND_SLOTS: &[&str] = &[
    "8-10am", "10am-12pm", "12-2pm", "2-4pm", "4-6pm", "6-8pm",
];

/// Player skill level, ordered beginner → pro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Beginner,
    Medium,
    Advanced,
    Pro,
}

impl SkillLevel {
    /// All levels in ascending order.
    pub const ALL: [SkillLevel; 4] = [
        SkillLevel::Beginner,
        SkillLevel::Medium,
        SkillLevel::Advanced,
        SkillLevel::Pro,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Medium => "medium",
            Self::Advanced => "advanced",
            Self::Pro => "pro",
        }
    }

    /// Button label with the level's color dot.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Beginner => "🟢 Beginner",
            Self::Medium => "🟡 Medium",
            Self::Advanced => "🟠 Advanced",
            Self::Pro => "🔴 Pro",
        }
    }
}

impl std::str::FromStr for SkillLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(Self::Beginner),
            "medium" => Ok(Self::Medium),
            "advanced" => Ok(Self::Advanced),
            "pro" => Ok(Self::Pro),
            other => Err(format!("unknown skill level: {other}")),
        }
    }
}

impl std::fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Day of the week. Ordering follows [`Day::ALL`], Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    /// All days, Monday first. Day-toggle callbacks index into this.
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    pub fn from_index(index: usize) -> Option<Day> {
        Self::ALL.get(index).copied()
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
        }
    }

    /// Three-letter abbreviation for compact keyboard buttons.
    pub fn short_name(&self) -> &'static str {
        &self.name()[..3]
    }

    pub fn is_weekend(&self) -> bool {
        matches!(self, Self::Saturday | Self::Sunday)
    }

    /// The time-slot catalog for this day.
    pub fn slots(&self) -> &'static [&'static str] {
        if self.is_weekend() {
            WEEKEND_SLOTS
        } else {
            WEEKDAY_SLOTS
        }
    }
}

impl std::fmt::Display for Day {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Build the composite availability key for a (day, slot) pair,
/// e.g. `Monday_7-9am`.
pub fn slot_key(day: Day, slot: &str) -> String {
    format!("{}_{slot}", day.name())
}

/// Split a composite key into `(day, time)` display parts.
///
/// Splits on the first `_` only — slot labels never contain one, but
/// this keeps the day part intact regardless.
pub fn split_slot_key(key: &str) -> (&str, &str) {
    match key.split_once('_') {
        Some((day, time)) => (day, time),
        None => (key, ""),
    }
}

/// Format a slot key for user-facing text: `Monday_7-9am` → `Monday 7-9am`.
pub fn display_slot(key: &str) -> String {
    let (day, time) = split_slot_key(key);
    if time.is_empty() {
        day.to_string()
    } else {
        format!("{day} {time}")
    }
}
