//! CLI subcommand implementations for habit-push.
//!
//! - [`serve`] - HTTP trigger for an external scheduler
//! - [`send`] - One-shot reminder run for cron-style schedulers
//! - [`keygen`] - VAPID key pair generation
//!
//! # Usage
//!
//! ```ignore
//! use habit_push::commands;
//!
//! commands::keygen::run()?;
//! commands::send::run(false).await?;
//! ```

pub mod keygen;
pub mod send;
pub mod serve;
