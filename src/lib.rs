//! habit-push - Web Push habit reminder sender.
//!
//! This crate delivers encrypted browser push notifications for a habit
//! tracker, speaking the Web Push protocols directly rather than through a
//! push library.
//!
//! # Architecture
//!
//! - **Notifications** - VAPID signing, payload encryption, framing, HTTP delivery
//! - **Reminders** - Per-subscription job deciding what to send and cleaning up
//! - **Store** - Subscriptions, habits and check-ins (Supabase or in-memory)
//! - **Server** - HTTP trigger for an external scheduler
//!
//! # Modules
//!
//! - [`notifications`] - Web Push sender (RFC 8291 / 8292 / 8188)
//! - [`reminders`] - Reminder job and its report types
//! - [`store`] - Store traits and implementations
//! - [`config`] - Configuration loading

// Library modules
pub mod commands;
pub mod notifications;
pub mod reminders;
pub mod server;
pub mod store;

pub mod config;
pub mod constants;
pub mod encoding;

// Re-export commonly used types
pub use config::Config;
pub use notifications::{DeliveryResult, PushDispatcher, PushSender, PushSubscription, VapidKeys};
pub use reminders::{JobReport, ReminderJob};
