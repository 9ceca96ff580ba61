//! Time-of-day reminders.
//!
//! # Responsibility
//! - Decide when a task's reminder fires and remember it was delivered.
//! - Hand delivery to a pluggable notifier chain.
//!
//! # See also
//! - `service::timeline_service` for the periodic tick entry points.

pub mod fire_tracker;
pub mod notifier;
