//! In-process store.
//!
//! Backs local runs (`HABIT_PUSH_FIXTURE=fixture.json`) and tests. The
//! fixture mirrors the app's tables:
//!
//! ```json
//! {
//!   "subscriptions": [{"id": "s1", "user_id": "u1", "endpoint": "...", "p256dh": "...", "auth_key": "..."}],
//!   "habits": [{"id": "h1", "user_id": "u1", "title": "Read", "start_date": "2026-01-01", "end_date": "2026-12-31"}],
//!   "check_ins": [{"habit_id": "h1", "check_in_date": "2026-10-17"}]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Habit, HabitStore, StoredSubscription, SubscriptionStore};

fn default_true() -> bool {
    true
}

/// A habit row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitRecord {
    /// Habit id.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Display title.
    pub title: String,
    /// First day the habit is tracked.
    pub start_date: NaiveDate,
    /// Last day the habit is tracked.
    pub end_date: NaiveDate,
    /// Whether the user wants reminders for it.
    #[serde(default = "default_true")]
    pub reminder_enabled: bool,
}

impl HabitRecord {
    fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// A daily check-in row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInRecord {
    /// Habit that was completed.
    pub habit_id: String,
    /// Day it was completed.
    pub check_in_date: NaiveDate,
}

/// Full store contents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    /// Push subscriptions.
    #[serde(default)]
    pub subscriptions: Vec<StoredSubscription>,
    /// Habits.
    #[serde(default)]
    pub habits: Vec<HabitRecord>,
    /// Check-ins.
    #[serde(default)]
    pub check_ins: Vec<CheckInRecord>,
}

/// Mutex-guarded in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<Fixture>,
}

impl MemoryStore {
    /// Create a store holding `fixture`.
    pub fn new(fixture: Fixture) -> Self {
        Self {
            data: Mutex::new(fixture),
        }
    }

    /// Load a fixture file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        let fixture: Fixture = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse fixture {}", path.display()))?;
        log::info!(
            "[Store] Loaded fixture {} ({} subscriptions, {} habits, {} check-ins)",
            path.display(),
            fixture.subscriptions.len(),
            fixture.habits.len(),
            fixture.check_ins.len()
        );
        Ok(Self::new(fixture))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Fixture>> {
        self.data
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory store lock poisoned: {e}"))
    }

    /// Snapshot of the stored subscriptions.
    pub fn subscriptions(&self) -> Result<Vec<StoredSubscription>> {
        Ok(self.lock()?.subscriptions.clone())
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn list_subscriptions(&self) -> Result<Vec<StoredSubscription>> {
        self.subscriptions()
    }

    async fn delete_subscription(&self, id: &str) -> Result<()> {
        self.lock()?.subscriptions.retain(|s| s.id != id);
        Ok(())
    }
}

#[async_trait]
impl HabitStore for MemoryStore {
    async fn active_reminder_habits(&self, user_id: &str, date: NaiveDate) -> Result<Vec<Habit>> {
        Ok(self
            .lock()?
            .habits
            .iter()
            .filter(|h| h.user_id == user_id && h.reminder_enabled && h.is_active_on(date))
            .map(|h| Habit {
                id: h.id.clone(),
                title: h.title.clone(),
            })
            .collect())
    }

    async fn completed_habit_ids(
        &self,
        habit_ids: &[String],
        date: NaiveDate,
    ) -> Result<HashSet<String>> {
        Ok(self
            .lock()?
            .check_ins
            .iter()
            .filter(|c| c.check_in_date == date && habit_ids.contains(&c.habit_id))
            .map(|c| c.habit_id.clone())
            .collect())
    }
}
