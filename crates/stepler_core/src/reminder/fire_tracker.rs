//! Reminder fire-tracker.
//!
//! # Responsibility
//! - Match each open task's `HH:MM` reminder against the current local time.
//! - Fire each `<taskId>-<HH:MM>` key at most once until the midnight reset.
//!
//! # Invariants
//! - Completed tasks never fire, checked at fire time.
//! - The fired set is only cleared when the local time reads `00:00`.

use crate::model::task::{Task, TaskId};
use chrono::{NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static REMINDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[01]\d|2[0-3]):[0-5]\d$").expect("valid reminder regex"));

/// Returns whether `value` is a zero-padded 24-hour `HH:MM` time.
pub fn is_valid_reminder(value: &str) -> bool {
    REMINDER_RE.is_match(value)
}

/// Formats a local time as zero-padded `HH:MM`.
pub fn format_hhmm(time: &NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Builds the fired-set key for one task at one time of day.
pub fn reminder_key(task_id: &str, hhmm: &str) -> String {
    format!("{task_id}-{hhmm}")
}

/// One reminder that became due on this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderFire {
    pub key: String,
    pub task_id: TaskId,
    /// Notification body (the task's display text).
    pub body: String,
}

/// In-memory fired-key set, persisted as `firedReminders`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FireTracker {
    fired: BTreeSet<String>,
}

impl FireTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores the set from its persisted array form.
    pub fn from_persisted(keys: &[String]) -> Self {
        Self {
            fired: keys.iter().cloned().collect(),
        }
    }

    /// Array form for persistence.
    pub fn fired_keys(&self) -> Vec<String> {
        self.fired.iter().cloned().collect()
    }

    pub fn has_fired(&self, key: &str) -> bool {
        self.fired.contains(key)
    }

    pub fn len(&self) -> usize {
        self.fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }

    /// Marks and returns every reminder due at `now`.
    pub fn collect_due(&mut self, tasks: &[Task], now: &NaiveTime) -> Vec<ReminderFire> {
        let hhmm = format_hhmm(now);
        let mut due = Vec::new();

        for task in tasks {
            if task.completed {
                continue;
            }
            let Some(reminder) = task.reminder.as_deref() else {
                continue;
            };
            if reminder.is_empty() || reminder != hhmm {
                continue;
            }

            let key = reminder_key(&task.id, &hhmm);
            if self.fired.insert(key.clone()) {
                due.push(ReminderFire {
                    key,
                    task_id: task.id.clone(),
                    body: task.display_text().to_string(),
                });
            }
        }

        due
    }

    /// Clears the set when `now` reads `00:00`. Returns whether it reset.
    ///
    /// May run several times inside the midnight minute; clearing an empty
    /// set is harmless.
    pub fn reset_at_midnight(&mut self, now: &NaiveTime) -> bool {
        if now.hour() != 0 || now.minute() != 0 {
            return false;
        }
        self.fired.clear();
        true
    }
}
