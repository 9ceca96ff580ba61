//! Today/history reconciliation.
//!
//! # Responsibility
//! - Partition tasks between today's working set and dated history days.
//! - Repair persisted history that holds incomplete tasks or duplicate days.
//!
//! # Invariants
//! - Pure: no I/O, no clock reads; `today` is supplied by the caller.
//! - Incomplete tasks and tasks without a timestamp ID never leave today.
//! - Re-running on its own output changes nothing.
//! - Tasks are moved by value with every field intact.

use crate::model::task::{DayKey, HistoryDay, Task};
use crate::timeline::day_key::{day_key_of, local_midnight_ms, ordering_timestamp, timestamp_of};
use std::collections::HashSet;

/// Today's tasks plus archived history days.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    pub tasks: Vec<Task>,
    pub history: Vec<HistoryDay>,
}

impl Timeline {
    pub fn new(tasks: Vec<Task>, history: Vec<HistoryDay>) -> Self {
        Self { tasks, history }
    }
}

/// Counters describing what one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Completed past-day tasks moved from today into history.
    pub migrated: usize,
    /// Incomplete tasks pulled out of history back into today.
    pub repaired: usize,
    /// Bucketed tasks skipped because their day already held the same ID.
    pub duplicates_dropped: usize,
    /// History days removed for being empty or merged into an earlier
    /// entry with the same date.
    pub days_removed: usize,
    /// History order changed during the final sort.
    pub reordered: bool,
}

impl ReconcileReport {
    /// Returns whether the output differs from the input.
    pub fn changed(&self) -> bool {
        self.migrated > 0
            || self.repaired > 0
            || self.duplicates_dropped > 0
            || self.days_removed > 0
            || self.reordered
    }
}

/// Output of [`reconcile`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub timeline: Timeline,
    pub report: ReconcileReport,
}

struct DayBucket {
    key: DayKey,
    midnight_ms: i64,
    tasks: Vec<Task>,
}

/// Recomputes which tasks belong to today and which to history.
///
/// Runs four passes: repair incomplete history tasks back into today,
/// partition today's tasks into day buckets, merge buckets into history
/// (de-duplicating by ID), then sort history by each day's first task.
pub fn reconcile(timeline: Timeline, today: &str) -> Reconciled {
    let mut report = ReconcileReport::default();
    let (repaired_tasks, mut history) = repair_history(timeline.history, &mut report);

    let mut remaining = repaired_tasks;
    let mut buckets: Vec<DayBucket> = Vec::new();

    for task in timeline.tasks {
        let Some(created_at) = timestamp_of(&task.id) else {
            remaining.push(task);
            continue;
        };

        let key = day_key_of(&created_at);
        if key == today || !task.completed {
            remaining.push(task);
            continue;
        }

        match buckets.iter_mut().find(|bucket| bucket.key == key) {
            Some(bucket) => bucket.tasks.push(task),
            None => buckets.push(DayBucket {
                key,
                midnight_ms: local_midnight_ms(&created_at),
                tasks: vec![task],
            }),
        }
    }

    buckets.sort_by_key(|bucket| bucket.midnight_ms);
    for bucket in buckets {
        report.migrated += bucket.tasks.len();
        match history.iter_mut().find(|day| day.date == bucket.key) {
            Some(day) => {
                let mut seen: HashSet<String> = day.tasks.iter().map(|t| t.id.clone()).collect();
                for task in bucket.tasks {
                    if seen.insert(task.id.clone()) {
                        day.tasks.push(task);
                    } else {
                        report.migrated -= 1;
                        report.duplicates_dropped += 1;
                    }
                }
            }
            None => history.push(HistoryDay::new(bucket.key, bucket.tasks)),
        }
    }

    report.reordered = sort_history(&mut history);

    Reconciled {
        timeline: Timeline::new(remaining, history),
        report,
    }
}

/// Returns whether today's set holds a completed task from an earlier day.
pub fn needs_rollover(tasks: &[Task], today: &str) -> bool {
    tasks.iter().any(|task| {
        task.completed
            && timestamp_of(&task.id).is_some_and(|created_at| day_key_of(&created_at) != today)
    })
}

/// Extracts incomplete tasks from history and drops days left empty.
///
/// Days repeating an earlier `date` are folded into the first occurrence.
fn repair_history(
    history: Vec<HistoryDay>,
    report: &mut ReconcileReport,
) -> (Vec<Task>, Vec<HistoryDay>) {
    let mut extracted = Vec::new();
    let mut kept: Vec<HistoryDay> = Vec::with_capacity(history.len());

    for day in history {
        let (incomplete, completed): (Vec<Task>, Vec<Task>) =
            day.tasks.into_iter().partition(|task| !task.completed);
        report.repaired += incomplete.len();
        extracted.extend(incomplete);

        if let Some(existing) = kept.iter_mut().find(|kept_day| kept_day.date == day.date) {
            report.days_removed += 1;
            for task in completed {
                if existing.contains(&task.id) {
                    report.duplicates_dropped += 1;
                } else {
                    existing.tasks.push(task);
                }
            }
            continue;
        }

        if completed.is_empty() {
            report.days_removed += 1;
            continue;
        }
        kept.push(HistoryDay::new(day.date, completed));
    }

    (extracted, kept)
}

/// Stable-sorts history by first task timestamp. Returns whether order changed.
fn sort_history(history: &mut [HistoryDay]) -> bool {
    let sort_key = |day: &HistoryDay| {
        day.tasks
            .first()
            .map_or(0, |task| ordering_timestamp(&task.id))
    };
    let already_sorted = history
        .windows(2)
        .all(|pair| sort_key(&pair[0]) <= sort_key(&pair[1]));
    if already_sorted {
        return false;
    }
    history.sort_by_key(sort_key);
    true
}
