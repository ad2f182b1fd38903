//! One-shot reminder run.
//!
//! Loads configuration, runs the job once and prints the report as JSON.
//! Meant for cron or any scheduler that can run a process.

use anyhow::Result;

use crate::config::Config;
use crate::reminders::ReminderJob;

/// Runs the reminder job once and prints the report to stdout.
pub async fn run(test: bool) -> Result<()> {
    let config = Config::load()?;
    config.validate()?;

    let job = ReminderJob::from_config(&config)?;
    let report = job.run(test).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
