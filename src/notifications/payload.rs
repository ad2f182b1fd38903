//! Notification payloads delivered to the service worker.
//!
//! The service worker reads `{title, body, icon, badge, tag, data: {url}}`
//! from the decrypted push. Each variant here owns its copy and serializes
//! to that shape; nothing downstream builds JSON by hand.

use anyhow::Result;
use serde::Serialize;

use crate::constants::{NOTIFICATION_CLICK_URL, NOTIFICATION_ICON};

/// Title used for every habit reminder.
pub const REMINDER_TITLE: &str = "🌱 Don't forget your habits!";

/// Suffix appended when more than one habit is still open.
const STREAK_SUFFIX: &str = "Keep your streak going!";

/// Habit reminder for the titles still open today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderPayload {
    incomplete_titles: Vec<String>,
}

impl ReminderPayload {
    /// Build a reminder. Returns `None` when nothing is left to do.
    pub fn new(incomplete_titles: Vec<String>) -> Option<Self> {
        (!incomplete_titles.is_empty()).then_some(Self { incomplete_titles })
    }

    /// Number of incomplete habits the reminder covers.
    pub fn incomplete_count(&self) -> usize {
        self.incomplete_titles.len()
    }

    /// Notification body.
    ///
    /// - one habit: `Don't forget: <title>`
    /// - two: `<t1>, <t2> - Keep your streak going!`
    /// - more: `<t1>, <t2> +<n> more - Keep your streak going!`
    pub fn body(&self) -> String {
        match self.incomplete_titles.as_slice() {
            [] => STREAK_SUFFIX.to_string(),
            [only] => format!("Don't forget: {only}"),
            [first, second] => format!("{first}, {second} - {STREAK_SUFFIX}"),
            [first, second, rest @ ..] => {
                format!("{first}, {second} +{} more - {STREAK_SUFFIX}", rest.len())
            }
        }
    }
}

/// Fixed diagnostic notification for verifying a client end to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TestPayload;

impl TestPayload {
    /// Notification title.
    pub const TITLE: &'static str = "🔔 Test notification";
    /// Notification body.
    pub const BODY: &'static str = "Push notifications are working!";
}

/// Payload variants sent by the reminder job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationPayload {
    /// Daily habit reminder.
    Reminder(ReminderPayload),
    /// Diagnostic push from test mode.
    Test(TestPayload),
}

/// Click-through data read by the service worker.
#[derive(Debug, Serialize)]
struct NotificationData<'a> {
    url: &'a str,
    kind: &'a str,
}

/// Wire shape consumed by the service worker.
#[derive(Debug, Serialize)]
struct NotificationMessage<'a> {
    title: &'a str,
    body: String,
    icon: &'a str,
    badge: &'a str,
    tag: &'a str,
    data: NotificationData<'a>,
}

impl NotificationPayload {
    /// Short name of the variant, also sent as `data.kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Reminder(_) => "reminder",
            Self::Test(_) => "test",
        }
    }

    /// Notification title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Reminder(_) => REMINDER_TITLE,
            Self::Test(_) => TestPayload::TITLE,
        }
    }

    /// Notification body.
    pub fn body(&self) -> String {
        match self {
            Self::Reminder(reminder) => reminder.body(),
            Self::Test(_) => TestPayload::BODY.to_string(),
        }
    }

    /// Serialize to the JSON string that gets encrypted.
    pub fn to_json(&self) -> Result<String> {
        let message = NotificationMessage {
            title: self.title(),
            body: self.body(),
            icon: NOTIFICATION_ICON,
            badge: NOTIFICATION_ICON,
            tag: match self {
                Self::Reminder(_) => "habit-reminder",
                Self::Test(_) => "habit-test",
            },
            data: NotificationData {
                url: NOTIFICATION_CLICK_URL,
                kind: self.kind(),
            },
        };
        Ok(serde_json::to_string(&message)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reminder(titles: &[&str]) -> ReminderPayload {
        ReminderPayload::new(titles.iter().map(ToString::to_string).collect()).unwrap()
    }

    #[test]
    fn test_empty_reminder_is_none() {
        assert!(ReminderPayload::new(Vec::new()).is_none());
    }

    #[test]
    fn test_single_habit_body() {
        assert_eq!(reminder(&["Read"]).body(), "Don't forget: Read");
    }

    #[test]
    fn test_two_habit_body() {
        assert_eq!(
            reminder(&["Read", "Run"]).body(),
            "Read, Run - Keep your streak going!"
        );
    }

    #[test]
    fn test_many_habit_body() {
        let payload = reminder(&["Read", "Run", "Stretch", "Journal"]);
        assert_eq!(payload.body(), "Read, Run +2 more - Keep your streak going!");
        assert_eq!(payload.incomplete_count(), 4);
    }

    #[test]
    fn test_reminder_json_shape() {
        let json = NotificationPayload::Reminder(reminder(&["Read"]))
            .to_json()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["title"], REMINDER_TITLE);
        assert_eq!(value["body"], "Don't forget: Read");
        assert_eq!(value["icon"], "/icon-192.png");
        assert_eq!(value["badge"], "/icon-192.png");
        assert_eq!(value["data"]["url"], "/");
        assert_eq!(value["data"]["kind"], "reminder");
    }

    #[test]
    fn test_test_payload_json_shape() {
        let json = NotificationPayload::Test(TestPayload).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["title"], TestPayload::TITLE);
        assert_eq!(value["body"], TestPayload::BODY);
        assert_eq!(value["data"]["kind"], "test");
    }
}
