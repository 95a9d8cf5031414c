//! User-created reminders: independent deadlines funnelled into one modal.

pub mod queue;
pub mod scheduler;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use queue::PresentationQueue;
pub use scheduler::ReminderScheduler;

pub type ReminderId = i64;

pub const SNOOZE_MINUTES: u32 = 5;
pub const SNOOZE_SUFFIX: &str = " (snoozed)";
/// Pause between resolving the displayed reminder and showing the next one.
pub const SETTLE_DELAY: Duration = Duration::from_millis(300);
pub const REFRESH_EVERY: Duration = Duration::from_secs(1);

/// Persisted form; scheduling handles live in [`ReminderScheduler`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: ReminderId,
    pub text: String,
    pub delay_minutes: u32,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}

impl Reminder {
    pub fn new(id: ReminderId, text: String, delay_minutes: u32, now: DateTime<Utc>) -> Self {
        Self {
            id,
            text,
            delay_minutes,
            created_at: now,
            deadline: now + chrono::Duration::minutes(i64::from(delay_minutes)),
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.deadline <= now
    }

    /// Whole seconds until the deadline, rounded up.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        let ms = (self.deadline - now).num_milliseconds().max(0) as u64;
        ms.div_ceil(1000)
    }

    pub fn snoozed_text(&self) -> String {
        format!("{}{SNOOZE_SUFFIX}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn deadline_and_countdown() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let reminder = Reminder::new(1, "stretch".into(), 2, now);
        assert_eq!(reminder.deadline, now + chrono::Duration::minutes(2));
        assert_eq!(reminder.remaining_secs(now), 120);
        assert_eq!(
            reminder.remaining_secs(now + chrono::Duration::milliseconds(500)),
            120
        );
        assert_eq!(reminder.remaining_secs(now + chrono::Duration::minutes(5)), 0);
        assert!(!reminder.is_due(now));
        assert!(reminder.is_due(reminder.deadline));
    }

    #[test]
    fn serializes_without_handles() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let json = serde_json::to_value(Reminder::new(7, "tea".into(), 1, now)).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["createdAt", "deadline", "delayMinutes", "id", "text"]);
    }
}
