//! Data-store seams consumed by the reminder job.
//!
//! Subscriptions, habits and check-ins live in an external store. The job
//! only reads them, except for deleting subscriptions the push service
//! reported as gone.
//!
//! - [`supabase::SupabaseStore`] - PostgREST tables of the habit app
//! - [`memory::MemoryStore`] - in-process store, loadable from a JSON fixture

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::notifications::PushSubscription;

pub mod memory;
pub mod supabase;

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

/// A push subscription row as stored by the app.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSubscription {
    /// Row id, used for deletion.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Push service endpoint URL.
    pub endpoint: String,
    /// Browser's P-256 ECDH public key (base64url).
    pub p256dh: String,
    /// Shared auth secret (base64url).
    pub auth_key: String,
}

impl StoredSubscription {
    /// The parts the dispatcher needs.
    pub fn push_subscription(&self) -> PushSubscription {
        PushSubscription {
            endpoint: self.endpoint.clone(),
            p256dh: self.p256dh.clone(),
            auth: self.auth_key.clone(),
        }
    }
}

/// A habit that is active and has reminders enabled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    /// Habit id.
    pub id: String,
    /// Display title, used in reminder copy.
    pub title: String,
}

/// Where push subscriptions are kept.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// All stored subscriptions.
    async fn list_subscriptions(&self) -> Result<Vec<StoredSubscription>>;

    /// Delete one subscription by row id. Deleting a missing id is not an error.
    async fn delete_subscription(&self, id: &str) -> Result<()>;
}

/// Read access to habits and daily check-ins.
#[async_trait]
pub trait HabitStore: Send + Sync {
    /// Habits of `user_id` that are active on `date` and have reminders on.
    async fn active_reminder_habits(&self, user_id: &str, date: NaiveDate) -> Result<Vec<Habit>>;

    /// Which of `habit_ids` were checked in on `date`.
    async fn completed_habit_ids(
        &self,
        habit_ids: &[String],
        date: NaiveDate,
    ) -> Result<HashSet<String>>;
}
