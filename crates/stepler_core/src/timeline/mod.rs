//! Today/history timeline rules.
//!
//! # Responsibility
//! - Own the day-key clock, the reconciler and the rollover trigger.
//! - Stay free of persistence and wall-clock reads so every rule is testable
//!   with explicit inputs.

pub mod day_key;
pub mod reconcile;
pub mod rollover;
