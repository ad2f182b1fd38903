//! Supabase store over the PostgREST API.
//!
//! Reads the app's `push_subscriptions`, `habits` and `daily_check_ins`
//! tables with the service role key, which bypasses row-level security.

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{Habit, HabitStore, StoredSubscription, SubscriptionStore};
use crate::constants;

/// PostgREST client for the habit app's tables.
#[derive(Clone)]
pub struct SupabaseStore {
    client: reqwest::Client,
    rest_url: String,
    service_key: String,
}

impl std::fmt::Debug for SupabaseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseStore")
            .field("rest_url", &self.rest_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct CheckInRow {
    habit_id: String,
}

impl SupabaseStore {
    /// Create a store for the project at `base_url` (without `/rest/v1`).
    pub fn new(base_url: &str, service_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(constants::HTTP_REQUEST_TIMEOUT)
            .user_agent(constants::user_agent())
            .build()
            .context("Failed to build Supabase HTTP client")?;
        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            service_key: service_key.into(),
        })
    }

    fn request(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}/{table}", self.rest_url))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        let response = self
            .request(reqwest::Method::GET, table)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to query {table}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Query on {table} failed (HTTP {status}): {body}");
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to decode {table} rows"))
    }
}

#[async_trait]
impl SubscriptionStore for SupabaseStore {
    async fn list_subscriptions(&self) -> Result<Vec<StoredSubscription>> {
        self.select(
            "push_subscriptions",
            &[("select", "id,user_id,endpoint,p256dh,auth_key".to_string())],
        )
        .await
    }

    async fn delete_subscription(&self, id: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::DELETE, "push_subscriptions")
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await
            .context("Failed to delete push subscription")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Deleting subscription {id} failed (HTTP {status}): {body}");
        }
        Ok(())
    }
}

#[async_trait]
impl HabitStore for SupabaseStore {
    async fn active_reminder_habits(&self, user_id: &str, date: NaiveDate) -> Result<Vec<Habit>> {
        let day = date.format("%Y-%m-%d").to_string();
        self.select(
            "habits",
            &[
                ("select", "id,title".to_string()),
                ("user_id", format!("eq.{user_id}")),
                ("start_date", format!("lte.{day}")),
                ("end_date", format!("gte.{day}")),
                ("reminder_enabled", "eq.true".to_string()),
            ],
        )
        .await
    }

    async fn completed_habit_ids(
        &self,
        habit_ids: &[String],
        date: NaiveDate,
    ) -> Result<HashSet<String>> {
        if habit_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let rows: Vec<CheckInRow> = self
            .select(
                "daily_check_ins",
                &[
                    ("select", "habit_id".to_string()),
                    ("habit_id", format!("in.({})", habit_ids.join(","))),
                    ("check_in_date", format!("eq.{}", date.format("%Y-%m-%d"))),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.habit_id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_url_normalized() {
        let store = SupabaseStore::new("https://abc.supabase.co/", "key").unwrap();
        assert_eq!(store.rest_url, "https://abc.supabase.co/rest/v1");
    }

    #[test]
    fn test_debug_hides_service_key() {
        let store = SupabaseStore::new("https://abc.supabase.co", "very-secret").unwrap();
        assert!(!format!("{store:?}").contains("very-secret"));
    }

    #[tokio::test]
    async fn test_no_habit_ids_skips_request() {
        // Unroutable base URL: any request would fail.
        let store = SupabaseStore::new("http://127.0.0.1:1", "key").unwrap();
        let done = store
            .completed_habit_ids(&[], NaiveDate::from_ymd_opt(2026, 10, 17).unwrap())
            .await
            .unwrap();
        assert!(done.is_empty());
    }
}
