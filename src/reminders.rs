//! Daily habit reminder job.
//!
//! Walks every stored push subscription, works out which of the owner's
//! habits are still open today and pushes a reminder listing them. Test mode
//! skips the habit lookup and sends a fixed diagnostic push to everyone.
//!
//! Deliveries run concurrently up to a configured bound. A failure for one
//! subscription is recorded in its report entry and never aborts the
//! others; only failing to list subscriptions fails the whole job.

// Rust guideline compliant 2026-02

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::config::{Config, StoreSettings};
use crate::constants::DEFAULT_CONCURRENCY;
use crate::notifications::{
    DeliveryResult, NotificationPayload, PushDispatcher, PushSender, ReminderPayload, TestPayload,
    VapidSigner,
};
use crate::store::{HabitStore, MemoryStore, StoredSubscription, SubscriptionStore, SupabaseStore};

/// Message returned when there is nobody to notify.
pub const NO_SUBSCRIPTIONS_MESSAGE: &str = "No subscriptions found";

/// What happened to one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Push accepted by the push service.
    Sent,
    /// Nothing to send.
    Skipped,
    /// Subscription expired and was removed from the store.
    Deleted,
    /// Delivery or lookup failed; the subscription is kept.
    Error,
}

/// Why a subscription was skipped or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportReason {
    /// The user has no active, reminder-enabled habits today.
    NoActiveHabits,
    /// Every active habit is already checked in.
    AllComplete,
    /// The push service answered 404/410.
    Expired,
}

/// Report entry for one subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionReport {
    /// Store row id.
    pub subscription_id: String,
    /// Owning user.
    pub user_id: String,
    /// Outcome.
    pub status: ReportStatus,
    /// Detail for skipped and deleted entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReportReason>,
    /// Open habits the reminder listed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incomplete_count: Option<usize>,
    /// Push service HTTP status, when one was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Failure text for error entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubscriptionReport {
    fn new(subscription: &StoredSubscription, status: ReportStatus) -> Self {
        Self {
            subscription_id: subscription.id.clone(),
            user_id: subscription.user_id.clone(),
            status,
            reason: None,
            incomplete_count: None,
            status_code: None,
            error: None,
        }
    }

    fn skipped(subscription: &StoredSubscription, reason: ReportReason) -> Self {
        Self {
            reason: Some(reason),
            ..Self::new(subscription, ReportStatus::Skipped)
        }
    }

    fn error(subscription: &StoredSubscription, error: &anyhow::Error) -> Self {
        Self {
            error: Some(format!("{error:#}")),
            ..Self::new(subscription, ReportStatus::Error)
        }
    }
}

/// Result of one job run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    /// Always `true`; job-level failures are returned as errors instead.
    pub success: bool,
    /// One entry per subscription, in listing order.
    pub results: Vec<SubscriptionReport>,
    /// Set when the run was in test mode.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub test: bool,
    /// Informational message (e.g. no subscriptions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JobReport {
    /// Number of entries with `status`.
    pub fn count(&self, status: ReportStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

/// Sends habit reminders to every stored subscription.
pub struct ReminderJob {
    subscriptions: Arc<dyn SubscriptionStore>,
    habits: Arc<dyn HabitStore>,
    sender: Arc<dyn PushSender>,
    concurrency: usize,
}

impl std::fmt::Debug for ReminderJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderJob")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl ReminderJob {
    /// Create a job over the given stores and sender.
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        habits: Arc<dyn HabitStore>,
        sender: Arc<dyn PushSender>,
    ) -> Self {
        Self {
            subscriptions,
            habits,
            sender,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Bound the number of deliveries in flight (at least one).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Wire up VAPID keys, dispatcher and store from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let keys = config.vapid_keys()?;
        let signer = VapidSigner::new(Arc::new(keys), config.vapid_subject.clone())?;
        let sender: Arc<dyn PushSender> = Arc::new(PushDispatcher::new(signer, config.ttl_secs)?);

        let job = match config.store_settings()? {
            StoreSettings::Fixture(path) => {
                let store = Arc::new(MemoryStore::from_json_file(&path)?);
                Self::new(Arc::clone(&store) as Arc<dyn SubscriptionStore>, store, sender)
            }
            StoreSettings::Supabase { url, service_key } => {
                let store = Arc::new(SupabaseStore::new(&url, service_key)?);
                Self::new(Arc::clone(&store) as Arc<dyn SubscriptionStore>, store, sender)
            }
        };

        Ok(job.with_concurrency(config.effective_concurrency()))
    }

    /// Run for today's UTC date.
    pub async fn run(&self, test: bool) -> Result<JobReport> {
        self.run_on(Utc::now().date_naive(), test).await
    }

    /// Run as if `today` were the current date.
    pub async fn run_on(&self, today: NaiveDate, test: bool) -> Result<JobReport> {
        let subscriptions = self
            .subscriptions
            .list_subscriptions()
            .await
            .context("Failed to list push subscriptions")?;

        if subscriptions.is_empty() {
            log::info!("[Reminders] No subscriptions found");
            return Ok(JobReport {
                success: true,
                results: Vec::new(),
                test,
                message: Some(NO_SUBSCRIPTIONS_MESSAGE.to_string()),
            });
        }

        log::info!(
            "[Reminders] Processing {} subscriptions for {today}{}",
            subscriptions.len(),
            if test { " (test mode)" } else { "" }
        );

        let results: Vec<SubscriptionReport> = stream::iter(
            subscriptions.into_iter().map(|subscription| async move {
                self.process(&subscription, today, test).await
            }),
        )
        .buffered(self.concurrency)
        .collect()
        .await;

        let report = JobReport {
            success: true,
            results,
            test,
            message: None,
        };
        log::info!(
            "[Reminders] Done: {} sent, {} skipped, {} deleted, {} errors",
            report.count(ReportStatus::Sent),
            report.count(ReportStatus::Skipped),
            report.count(ReportStatus::Deleted),
            report.count(ReportStatus::Error)
        );
        Ok(report)
    }

    async fn process(
        &self,
        subscription: &StoredSubscription,
        today: NaiveDate,
        test: bool,
    ) -> SubscriptionReport {
        if test {
            return self
                .deliver(subscription, &NotificationPayload::Test(TestPayload), None)
                .await;
        }

        match self.reminder_for(&subscription.user_id, today).await {
            Ok(Err(reason)) => SubscriptionReport::skipped(subscription, reason),
            Ok(Ok(payload)) => {
                let count = payload.incomplete_count();
                self.deliver(subscription, &NotificationPayload::Reminder(payload), Some(count))
                    .await
            }
            Err(e) => {
                log::warn!(
                    "[Reminders] Habit lookup failed for subscription {}: {e:#}",
                    subscription.id
                );
                SubscriptionReport::error(subscription, &e)
            }
        }
    }

    /// Reminder for the user's open habits, or why there is none.
    async fn reminder_for(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<Result<ReminderPayload, ReportReason>> {
        let habits = self
            .habits
            .active_reminder_habits(user_id, today)
            .await
            .context("Failed to load active habits")?;
        if habits.is_empty() {
            return Ok(Err(ReportReason::NoActiveHabits));
        }

        let ids: Vec<String> = habits.iter().map(|h| h.id.clone()).collect();
        let completed: HashSet<String> = self
            .habits
            .completed_habit_ids(&ids, today)
            .await
            .context("Failed to load check-ins")?;

        let open: Vec<String> = habits
            .into_iter()
            .filter(|h| !completed.contains(&h.id))
            .map(|h| h.title)
            .collect();

        Ok(ReminderPayload::new(open).ok_or(ReportReason::AllComplete))
    }

    async fn deliver(
        &self,
        subscription: &StoredSubscription,
        payload: &NotificationPayload,
        incomplete_count: Option<usize>,
    ) -> SubscriptionReport {
        let json = match payload.to_json() {
            Ok(json) => json,
            Err(e) => return SubscriptionReport::error(subscription, &e),
        };

        let result = self
            .sender
            .send(&subscription.push_subscription(), &json)
            .await;
        self.record(subscription, result, incomplete_count).await
    }

    async fn record(
        &self,
        subscription: &StoredSubscription,
        result: DeliveryResult,
        incomplete_count: Option<usize>,
    ) -> SubscriptionReport {
        if result.success {
            return SubscriptionReport {
                incomplete_count,
                status_code: result.status_code,
                ..SubscriptionReport::new(subscription, ReportStatus::Sent)
            };
        }

        if result.is_gone() {
            return match self.subscriptions.delete_subscription(&subscription.id).await {
                Ok(()) => {
                    log::info!("[Reminders] Deleted expired subscription {}", subscription.id);
                    SubscriptionReport {
                        reason: Some(ReportReason::Expired),
                        status_code: result.status_code,
                        ..SubscriptionReport::new(subscription, ReportStatus::Deleted)
                    }
                }
                Err(e) => {
                    log::warn!(
                        "[Reminders] Failed to delete expired subscription {}: {e:#}",
                        subscription.id
                    );
                    SubscriptionReport {
                        reason: Some(ReportReason::Expired),
                        status_code: result.status_code,
                        ..SubscriptionReport::error(subscription, &e)
                    }
                }
            };
        }

        SubscriptionReport {
            status_code: result.status_code,
            error: result.error,
            ..SubscriptionReport::new(subscription, ReportStatus::Error)
        }
    }
}
