//! Cooperative periodic timers.
//!
//! # Responsibility
//! - Track when the rollover, reminder and midnight checks are due.
//! - Let a single-threaded host sleep until the next deadline and dispatch
//!   due checks itself.
//!
//! # Invariants
//! - Deadlines use monotonic `Instant`s; wall-clock jumps do not skew them.
//! - A timer that fell several periods behind fires once, then re-arms from
//!   `now` rather than replaying missed ticks.

use std::time::{Duration, Instant};

/// Rollover check period.
pub const ROLLOVER_INTERVAL: Duration = Duration::from_secs(60);
/// Reminder check period.
pub const REMINDER_INTERVAL: Duration = Duration::from_secs(30);
/// Midnight reset check period.
pub const MIDNIGHT_INTERVAL: Duration = Duration::from_secs(60);

/// Periodic check kinds dispatched by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Rollover,
    Reminder,
    Midnight,
}

/// One fixed-period timer.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    next_due: Instant,
}

impl Ticker {
    /// First fires one full `interval` after `start`.
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            next_due: start + interval,
        }
    }

    /// Fires at `start`, then every `interval`.
    pub fn immediate(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            next_due: start,
        }
    }

    pub fn next_due(&self) -> Instant {
        self.next_due
    }

    /// Returns whether the timer is due at `now`, re-arming it if so.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due += self.interval;
        if self.next_due <= now {
            self.next_due = now + self.interval;
        }
        true
    }
}

/// Timer set for the three periodic checks.
#[derive(Debug, Clone)]
pub struct Scheduler {
    timers: Vec<(TimerKind, Ticker)>,
}

impl Scheduler {
    /// Standard periods. The reminder check also runs at `start`.
    pub fn new(start: Instant) -> Self {
        Self::with_intervals(start, ROLLOVER_INTERVAL, REMINDER_INTERVAL, MIDNIGHT_INTERVAL)
    }

    pub fn with_intervals(
        start: Instant,
        rollover: Duration,
        reminder: Duration,
        midnight: Duration,
    ) -> Self {
        Self {
            timers: vec![
                (TimerKind::Rollover, Ticker::new(rollover, start)),
                (TimerKind::Reminder, Ticker::immediate(reminder, start)),
                (TimerKind::Midnight, Ticker::new(midnight, start)),
            ],
        }
    }

    /// Returns every timer due at `now`, in registration order.
    pub fn poll(&mut self, now: Instant) -> Vec<TimerKind> {
        self.timers
            .iter_mut()
            .filter_map(|(kind, ticker)| ticker.poll(now).then_some(*kind))
            .collect()
    }

    /// Earliest upcoming deadline across all timers.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|(_, ticker)| ticker.next_due()).min()
    }
}

#[cfg(test)]
mod tests {
    use super::{Scheduler, Ticker, TimerKind};
    use std::time::{Duration, Instant};

    #[test]
    fn ticker_fires_once_per_period() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_secs(60), start);

        assert!(!ticker.poll(start + Duration::from_secs(59)));
        assert!(ticker.poll(start + Duration::from_secs(60)));
        assert!(!ticker.poll(start + Duration::from_secs(61)));
        assert_eq!(ticker.next_due(), start + Duration::from_secs(120));
    }

    #[test]
    fn late_ticker_does_not_replay_missed_ticks() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_secs(30), start);
        let late = start + Duration::from_secs(200);

        assert!(ticker.poll(late));
        assert!(!ticker.poll(late));
        assert_eq!(ticker.next_due(), late + Duration::from_secs(30));
    }

    #[test]
    fn scheduler_runs_reminder_immediately_then_on_period() {
        let start = Instant::now();
        let mut scheduler = Scheduler::new(start);

        assert_eq!(scheduler.poll(start), vec![TimerKind::Reminder]);
        assert_eq!(scheduler.next_deadline(), Some(start + Duration::from_secs(30)));
        assert_eq!(
            scheduler.poll(start + Duration::from_secs(30)),
            vec![TimerKind::Reminder]
        );
        assert_eq!(
            scheduler.poll(start + Duration::from_secs(60)),
            vec![TimerKind::Rollover, TimerKind::Reminder, TimerKind::Midnight]
        );
    }
}
