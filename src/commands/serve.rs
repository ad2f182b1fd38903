//! HTTP trigger server command.

use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::reminders::ReminderJob;
use crate::server;

/// Validates configuration, then serves the trigger until Ctrl-C.
///
/// Configuration problems fail here, before the listener is bound.
pub async fn run() -> Result<()> {
    let config = Config::load()?;
    config.validate()?;
    log::debug!("[Config] Loaded {config:?}");

    let job = Arc::new(ReminderJob::from_config(&config)?);
    server::serve(&config.listen_addr, job).await
}
