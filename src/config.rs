//! Configuration loading.
//!
//! Non-secret settings come from an optional `config.json` in the config
//! directory; environment variables override them. VAPID keys and the store
//! service key are only ever read from the environment and never serialized.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{fmt, fs};

use crate::constants::{
    DEFAULT_CONCURRENCY, DEFAULT_LISTEN_ADDR, DEFAULT_TTL_SECS, DEFAULT_VAPID_SUBJECT,
};
use crate::notifications::VapidKeys;

/// Where the reminder job reads subscriptions and habits from.
#[derive(Clone, PartialEq, Eq)]
pub enum StoreSettings {
    /// In-memory store loaded from a JSON fixture.
    Fixture(PathBuf),
    /// Supabase PostgREST API.
    Supabase {
        /// Project URL, e.g. `https://xyz.supabase.co`.
        url: String,
        /// Service role key, sent as `apikey` and bearer token.
        service_key: String,
    },
}

impl fmt::Debug for StoreSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixture(path) => f.debug_tuple("Fixture").field(path).finish(),
            Self::Supabase { url, .. } => f
                .debug_struct("Supabase")
                .field("url", url)
                .field("service_key", &"<redacted>")
                .finish(),
        }
    }
}

/// Configuration for the habit-push service.
#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP trigger binds to.
    pub listen_addr: String,
    /// Maximum deliveries in flight.
    pub concurrency: usize,
    /// `TTL` header sent with each push, in seconds.
    pub ttl_secs: u32,
    /// VAPID `sub` claim (`mailto:` or `https:` URI).
    pub vapid_subject: String,
    /// JSON fixture to serve from memory instead of Supabase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixture_path: Option<PathBuf>,
    /// Supabase project URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supabase_url: Option<String>,
    /// VAPID public key (base64url) - env only.
    #[serde(skip)]
    pub vapid_public_key: String,
    /// VAPID private key (base64url) - env only.
    #[serde(skip)]
    pub vapid_private_key: String,
    /// Supabase service role key - env only.
    #[serde(skip)]
    pub supabase_service_role_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            ttl_secs: DEFAULT_TTL_SECS,
            vapid_subject: DEFAULT_VAPID_SUBJECT.to_string(),
            fixture_path: None,
            supabase_url: None,
            vapid_public_key: String::new(),
            vapid_private_key: String::new(),
            supabase_service_role_key: String::new(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |s: &str| if s.is_empty() { "<unset>" } else { "<redacted>" };
        f.debug_struct("Config")
            .field("listen_addr", &self.listen_addr)
            .field("concurrency", &self.concurrency)
            .field("ttl_secs", &self.ttl_secs)
            .field("vapid_subject", &self.vapid_subject)
            .field("fixture_path", &self.fixture_path)
            .field("supabase_url", &self.supabase_url)
            .field("vapid_public_key", &self.vapid_public_key)
            .field("vapid_private_key", &redact(&self.vapid_private_key))
            .field(
                "supabase_service_role_key",
                &redact(&self.supabase_service_role_key),
            )
            .finish()
    }
}

impl Config {
    /// Returns the configuration directory path.
    ///
    /// `HABIT_PUSH_CONFIG_DIR` wins; otherwise the platform config dir
    /// (e.g. `~/.config/habit-push`).
    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("HABIT_PUSH_CONFIG_DIR") {
            return Ok(PathBuf::from(dir));
        }
        Ok(dirs::config_dir()
            .context("Could not determine config directory")?
            .join("habit-push"))
    }

    /// Loads configuration from file, with environment variable overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_dir(&Self::config_dir()?)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Reads `config.json` from `dir`, falling back to defaults when absent.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join("config.json");
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    /// Applies overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary variable lookup.
    ///
    /// Empty values are ignored, as are numbers that fail to parse.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(addr) = var("HABIT_PUSH_LISTEN_ADDR") {
            self.listen_addr = addr;
        }

        if let Some(concurrency) = var("HABIT_PUSH_CONCURRENCY") {
            match concurrency.parse::<usize>() {
                Ok(n) => self.concurrency = n,
                Err(_) => log::warn!("[Config] Ignoring invalid HABIT_PUSH_CONCURRENCY={concurrency}"),
            }
        }

        if let Some(ttl) = var("HABIT_PUSH_TTL") {
            match ttl.parse::<u32>() {
                Ok(n) => self.ttl_secs = n,
                Err(_) => log::warn!("[Config] Ignoring invalid HABIT_PUSH_TTL={ttl}"),
            }
        }

        if let Some(subject) = var("VAPID_SUBJECT") {
            self.vapid_subject = subject;
        }

        if let Some(path) = var("HABIT_PUSH_FIXTURE") {
            self.fixture_path = Some(PathBuf::from(path));
        }

        if let Some(url) = var("SUPABASE_URL") {
            self.supabase_url = Some(url);
        }

        if let Some(key) = var("VAPID_PUBLIC_KEY") {
            self.vapid_public_key = key.trim().to_string();
        }

        if let Some(key) = var("VAPID_PRIVATE_KEY") {
            self.vapid_private_key = key.trim().to_string();
        }

        if let Some(key) = var("SUPABASE_SERVICE_ROLE_KEY") {
            self.supabase_service_role_key = key.trim().to_string();
        }
    }

    /// Concurrency clamped to at least one.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    /// Parses and cross-checks the VAPID key pair.
    pub fn vapid_keys(&self) -> Result<VapidKeys> {
        if self.vapid_public_key.is_empty() || self.vapid_private_key.is_empty() {
            anyhow::bail!("VAPID keys not configured (set VAPID_PUBLIC_KEY and VAPID_PRIVATE_KEY)");
        }
        VapidKeys::from_base64url(&self.vapid_public_key, &self.vapid_private_key)
            .context("Invalid VAPID key pair")
    }

    /// Resolves the store backend. A fixture takes precedence over Supabase.
    pub fn store_settings(&self) -> Result<StoreSettings> {
        if let Some(path) = &self.fixture_path {
            return Ok(StoreSettings::Fixture(path.clone()));
        }

        let url = self
            .supabase_url
            .as_deref()
            .context("No store configured (set SUPABASE_URL or HABIT_PUSH_FIXTURE)")?;
        url::Url::parse(url).with_context(|| format!("Invalid SUPABASE_URL: {url}"))?;
        if self.supabase_service_role_key.is_empty() {
            anyhow::bail!("SUPABASE_SERVICE_ROLE_KEY is required with SUPABASE_URL");
        }

        Ok(StoreSettings::Supabase {
            url: url.trim_end_matches('/').to_string(),
            service_key: self.supabase_service_role_key.clone(),
        })
    }

    /// Checks everything a reminder job needs before it starts.
    pub fn validate(&self) -> Result<()> {
        self.vapid_keys()?;
        self.store_settings()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn with_keys() -> Config {
        let keys = VapidKeys::generate();
        let mut config = Config::default();
        config.vapid_public_key = keys.public_key_base64url().to_string();
        config.vapid_private_key = keys.private_key_base64url();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.listen_addr, "0.0.0.0:8787");
        assert_eq!(config.concurrency, 16);
        assert_eq!(config.ttl_secs, 86_400);
        assert_eq!(config.vapid_subject, "mailto:notifications@us-better.lovable.app");
    }

    #[test]
    fn test_serialization_excludes_secrets() {
        let mut config = with_keys();
        config.supabase_service_role_key = "service_secret".to_string();
        let json = serde_json::to_string(&config).unwrap();

        assert!(!json.contains(&config.vapid_private_key));
        assert!(!json.contains("service_secret"));
        assert!(!json.contains("vapid_private_key"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = with_keys();
        config.supabase_service_role_key = "service_secret".to_string();
        let debug = format!("{config:?}");
        assert!(!debug.contains(&config.vapid_private_key));
        assert!(!debug.contains("service_secret"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.concurrency, 16);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{"concurrency": 4, "supabase_url": "https://abc.supabase.co"}"#,
        )
        .unwrap();

        let config = Config::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.supabase_url.as_deref(), Some("https://abc.supabase.co"));
        assert_eq!(config.ttl_secs, 86_400);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("config.json"), "{not json").unwrap();
        assert!(Config::load_from_dir(dir.path()).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides_from(env(&[
            ("HABIT_PUSH_LISTEN_ADDR", "127.0.0.1:9000"),
            ("HABIT_PUSH_CONCURRENCY", "3"),
            ("HABIT_PUSH_TTL", "60"),
            ("VAPID_SUBJECT", "https://example.com"),
            ("SUPABASE_URL", "https://abc.supabase.co"),
            ("SUPABASE_SERVICE_ROLE_KEY", " key "),
        ]));

        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.ttl_secs, 60);
        assert_eq!(config.vapid_subject, "https://example.com");
        assert_eq!(config.supabase_service_role_key, "key");
    }

    #[test]
    fn test_invalid_numbers_and_empty_values_ignored() {
        let mut config = Config::default();
        config.apply_overrides_from(env(&[
            ("HABIT_PUSH_CONCURRENCY", "many"),
            ("HABIT_PUSH_TTL", "-1"),
            ("VAPID_SUBJECT", ""),
        ]));

        assert_eq!(config.concurrency, 16);
        assert_eq!(config.ttl_secs, 86_400);
        assert_eq!(config.vapid_subject, DEFAULT_VAPID_SUBJECT);
    }

    #[test]
    fn test_effective_concurrency_clamped() {
        let config = Config {
            concurrency: 0,
            ..Config::default()
        };
        assert_eq!(config.effective_concurrency(), 1);
    }

    #[test]
    fn test_vapid_keys_required_and_checked() {
        assert!(Config::default().vapid_keys().is_err());

        let config = with_keys();
        assert!(config.vapid_keys().is_ok());

        let mut mismatched = with_keys();
        mismatched.vapid_public_key = VapidKeys::generate().public_key_base64url().to_string();
        assert!(mismatched.vapid_keys().is_err());
    }

    #[test]
    fn test_store_settings() {
        let mut config = with_keys();
        assert!(config.store_settings().is_err());
        assert!(config.validate().is_err());

        config.supabase_url = Some("https://abc.supabase.co/".to_string());
        assert!(config.store_settings().is_err(), "service key missing");

        config.supabase_service_role_key = "key".to_string();
        assert_eq!(
            config.store_settings().unwrap(),
            StoreSettings::Supabase {
                url: "https://abc.supabase.co".to_string(),
                service_key: "key".to_string(),
            }
        );
        assert!(config.validate().is_ok());

        config.fixture_path = Some(PathBuf::from("fixture.json"));
        assert_eq!(
            config.store_settings().unwrap(),
            StoreSettings::Fixture(PathBuf::from("fixture.json"))
        );
    }

    #[test]
    fn test_invalid_supabase_url() {
        let mut config = with_keys();
        config.supabase_url = Some("not a url".to_string());
        config.supabase_service_role_key = "key".to_string();
        assert!(config.store_settings().is_err());
    }
}
