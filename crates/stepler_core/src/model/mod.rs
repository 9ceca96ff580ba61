//! Domain model for the daily task timeline.
//!
//! # Responsibility
//! - Define the task, history and document shapes persisted by the desktop
//!   shell.
//! - Keep unknown fields attached to their record so nothing is lost across
//!   migration or re-serialization.
//!
//! # Invariants
//! - A task is identified by its `id`; timestamp-like IDs double as creation
//!   time in epoch milliseconds.
//! - Records are moved by value between today, history and trash.

pub mod document;
pub mod task;
