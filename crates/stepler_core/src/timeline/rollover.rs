//! Day-boundary rollover trigger.
//!
//! # Responsibility
//! - On each tick, detect completed tasks whose day has passed and run the
//!   reconciler over the latest timeline.
//!
//! # Invariants
//! - A tick that finds nothing to migrate returns `None` and causes no write.
//! - The trigger never holds a copy of the timeline between ticks; callers
//!   pass the current state on every call.

use crate::model::task::{HistoryDay, Task};
use crate::timeline::reconcile::{needs_rollover, reconcile, Reconciled, Timeline};
use log::info;

/// Trigger phase. `Migrating` only lasts for the synchronous reconcile call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloverState {
    Idle,
    Migrating,
}

/// Periodic rollover state machine.
#[derive(Debug)]
pub struct RolloverTrigger {
    state: RolloverState,
}

impl Default for RolloverTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl RolloverTrigger {
    pub fn new() -> Self {
        Self {
            state: RolloverState::Idle,
        }
    }

    pub fn state(&self) -> RolloverState {
        self.state
    }

    /// Runs one rollover check against the current tasks and history.
    ///
    /// Returns the reconciled timeline only when a migration was needed;
    /// the inputs are only copied in that case.
    pub fn tick(
        &mut self,
        tasks: &[Task],
        history: &[HistoryDay],
        today: &str,
    ) -> Option<Reconciled> {
        if self.state == RolloverState::Migrating {
            return None;
        }
        if !needs_rollover(tasks, today) {
            return None;
        }

        self.state = RolloverState::Migrating;
        let reconciled = reconcile(Timeline::new(tasks.to_vec(), history.to_vec()), today);
        self.state = RolloverState::Idle;

        info!(
            "event=rollover module=timeline status=ok migrated={} repaired={} history_days={}",
            reconciled.report.migrated,
            reconciled.report.repaired,
            reconciled.timeline.history.len()
        );
        Some(reconciled)
    }
}
