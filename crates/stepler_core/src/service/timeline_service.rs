//! Timeline use-case service.
//!
//! # Responsibility
//! - Own the live document: the one source of truth every tick reads.
//! - Run load-time reconciliation and the periodic rollover, reminder and
//!   midnight checks.
//! - Provide task, subtask and trash operations for UI/CLI callers.
//!
//! # Invariants
//! - Every mutation replaces whole fields and persists only the fields it
//!   touched.
//! - Persistence is fire-and-forget: a failed save is logged and the
//!   in-memory state stays authoritative. Fields whose save failed survive
//!   `reload` and are written again there.
//! - Task text is never logged.

use crate::model::document::{AppDocument, DocumentPatch};
use crate::model::task::{DeletedTask, HistoryDay, Subtask, Task, TaskId};
use crate::reminder::fire_tracker::{is_valid_reminder, FireTracker, ReminderFire};
use crate::reminder::notifier::{Notifier, NOTIFICATION_TITLE};
use crate::repo::document_repo::DocumentRepository;
use crate::search::{search_timeline, SearchHit};
use crate::timeline::day_key::day_key_of;
use crate::timeline::reconcile::{reconcile, ReconcileReport, Timeline};
use crate::timeline::rollover::RolloverTrigger;
use chrono::{DateTime, Local};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for timeline use-cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// No task with this ID in the searched collection.
    TaskNotFound(TaskId),
    SubtaskNotFound {
        task_id: TaskId,
        subtask_id: TaskId,
    },
    /// Reminder is not a zero-padded 24-hour `HH:MM` time.
    InvalidReminder(String),
    /// Text is empty after trimming.
    EmptyText,
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::SubtaskNotFound {
                task_id,
                subtask_id,
            } => write!(f, "subtask not found: {subtask_id} (task {task_id})"),
            Self::InvalidReminder(value) => {
                write!(f, "invalid reminder `{value}`; expected HH:MM (24h)")
            }
            Self::EmptyText => write!(f, "text cannot be empty"),
        }
    }
}

impl Error for ServiceError {}

enum TaskLocation {
    Today(usize),
    History { day: usize, index: usize },
}

/// Timeline service over a document repository.
pub struct TimelineService<R: DocumentRepository> {
    repo: R,
    doc: AppDocument,
    fired: FireTracker,
    rollover: RolloverTrigger,
    /// Fields whose last save failed.
    unsaved: DocumentPatch,
}

impl<R: DocumentRepository> TimelineService<R> {
    /// Loads the document and reconciles it unconditionally.
    ///
    /// Tasks and history are written back only when reconciliation changed
    /// them.
    pub fn open(repo: R, now: DateTime<Local>) -> Self {
        let doc = repo.load();
        let fired = FireTracker::from_persisted(&doc.fired_reminders);
        let mut service = Self {
            repo,
            doc,
            fired,
            rollover: RolloverTrigger::new(),
            unsaved: DocumentPatch::default(),
        };
        service.reconcile_now(now);
        service
    }

    /// Re-reads the stored document so writes from other processes sharing
    /// the store are not overwritten by the next tick.
    ///
    /// Fields that failed to save keep their in-memory value and are saved
    /// again.
    pub fn reload(&mut self) {
        let mut doc = self.repo.load();
        doc.apply(&self.unsaved);
        self.doc = doc;
        self.fired = FireTracker::from_persisted(&self.doc.fired_reminders);
        if !self.unsaved.is_empty() {
            self.persist(self.unsaved.clone());
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.doc.tasks
    }

    pub fn history(&self) -> &[HistoryDay] {
        &self.doc.history
    }

    pub fn deleted_tasks(&self) -> &[DeletedTask] {
        &self.doc.deleted_tasks
    }

    pub fn document(&self) -> &AppDocument {
        &self.doc
    }

    pub fn fired_reminders(&self) -> Vec<String> {
        self.fired.fired_keys()
    }

    /// Runs reconciliation over the current state for the day of `now`.
    pub fn reconcile_now(&mut self, now: DateTime<Local>) -> ReconcileReport {
        let today = day_key_of(&now);
        let reconciled = reconcile(self.take_timeline(), &today);
        let report = reconciled.report;
        self.put_timeline(reconciled.timeline);

        info!(
            "event=reconcile module=service status=ok today={} migrated={} repaired={} duplicates_dropped={} days_removed={} changed={}",
            today,
            report.migrated,
            report.repaired,
            report.duplicates_dropped,
            report.days_removed,
            report.changed()
        );
        if report.changed() {
            self.persist_timeline();
        }
        report
    }

    /// 60-second rollover check. Returns the report when a migration ran.
    pub fn rollover_tick(&mut self, now: DateTime<Local>) -> Option<ReconcileReport> {
        let today = day_key_of(&now);
        let reconciled = self
            .rollover
            .tick(&self.doc.tasks, &self.doc.history, &today)?;
        self.put_timeline(reconciled.timeline);
        self.persist_timeline();
        Some(reconciled.report)
    }

    /// 30-second reminder check. Returns reminders fired on this tick.
    ///
    /// Each reminder is handed to `notifier` once; failures are not retried.
    pub fn reminder_tick<N: Notifier>(
        &mut self,
        now: DateTime<Local>,
        notifier: &N,
    ) -> Vec<ReminderFire> {
        let due = self.fired.collect_due(&self.doc.tasks, &now.time());
        if due.is_empty() {
            return due;
        }

        self.sync_fired_reminders();
        for fire in &due {
            let delivered = notifier.notify(NOTIFICATION_TITLE, &fire.body);
            info!(
                "event=reminder_fire module=service status={} task_id={}",
                if delivered { "ok" } else { "error" },
                fire.task_id
            );
        }
        due
    }

    /// 60-second midnight check. Returns whether the fired set was cleared.
    pub fn midnight_tick(&mut self, now: DateTime<Local>) -> bool {
        if !self.fired.reset_at_midnight(&now.time()) {
            return false;
        }
        info!("event=reminder_reset module=service status=ok");
        self.sync_fired_reminders();
        true
    }

    /// Appends a new incomplete task stamped with `now`.
    pub fn add_task(&mut self, text: &str, now: DateTime<Local>) -> ServiceResult<Task> {
        let text = non_empty(text)?;
        let mut millis = now.timestamp_millis();
        while self.id_in_use(&millis.to_string()) {
            millis += 1;
        }

        let task = Task::new(millis.to_string(), text);
        self.doc.tasks.push(task.clone());
        self.persist(DocumentPatch::tasks(self.doc.tasks.clone()));
        Ok(task)
    }

    /// Flips completion. History tasks that become incomplete return to today.
    pub fn toggle_task(&mut self, id: &str, now: DateTime<Local>) -> ServiceResult<bool> {
        match self.locate(id)? {
            TaskLocation::Today(index) => {
                let task = &mut self.doc.tasks[index];
                task.completed = !task.completed;
                let completed = task.completed;
                self.persist(DocumentPatch::tasks(self.doc.tasks.clone()));
                Ok(completed)
            }
            TaskLocation::History { day, index } => {
                let task = &mut self.doc.history[day].tasks[index];
                task.completed = !task.completed;
                let completed = task.completed;
                // Repairs the now-incomplete task back into today.
                self.reconcile_now(now);
                Ok(completed)
            }
        }
    }

    pub fn toggle_priority(&mut self, id: &str) -> ServiceResult<bool> {
        let task = self.today_task_mut(id)?;
        task.priority = !task.priority;
        let priority = task.priority;
        self.persist(DocumentPatch::tasks(self.doc.tasks.clone()));
        Ok(priority)
    }

    pub fn edit_text(&mut self, id: &str, text: &str) -> ServiceResult<()> {
        let text = non_empty(text)?;
        self.today_task_mut(id)?.text = text;
        self.persist(DocumentPatch::tasks(self.doc.tasks.clone()));
        Ok(())
    }

    /// Sets or clears (`None`) a task's `HH:MM` reminder.
    pub fn set_reminder(&mut self, id: &str, reminder: Option<&str>) -> ServiceResult<()> {
        let reminder = match reminder.map(str::trim) {
            Some(value) if !is_valid_reminder(value) => {
                return Err(ServiceError::InvalidReminder(value.to_string()));
            }
            Some(value) => Some(value.to_string()),
            None => None,
        };
        self.today_task_mut(id)?.reminder = reminder;
        self.persist(DocumentPatch::tasks(self.doc.tasks.clone()));
        Ok(())
    }

    pub fn remove_attachment(&mut self, id: &str) -> ServiceResult<()> {
        self.today_task_mut(id)?.attachment = None;
        self.persist(DocumentPatch::tasks(self.doc.tasks.clone()));
        Ok(())
    }

    /// Replaces project labels; the legacy single `project` is cleared.
    pub fn set_projects(&mut self, id: &str, projects: Vec<String>) -> ServiceResult<()> {
        let projects: Vec<String> = projects
            .into_iter()
            .map(|project| project.trim().to_string())
            .filter(|project| !project.is_empty())
            .collect();
        let task = self.today_task_mut(id)?;
        task.project = None;
        task.projects = if projects.is_empty() {
            None
        } else {
            Some(projects)
        };
        self.persist(DocumentPatch::tasks(self.doc.tasks.clone()));
        Ok(())
    }

    pub fn set_due_date(&mut self, id: &str, due_date: Option<String>) -> ServiceResult<()> {
        self.today_task_mut(id)?.due_date = due_date;
        self.persist(DocumentPatch::tasks(self.doc.tasks.clone()));
        Ok(())
    }

    pub fn add_subtask(
        &mut self,
        task_id: &str,
        text: &str,
        now: DateTime<Local>,
    ) -> ServiceResult<Subtask> {
        let text = non_empty(text)?;
        let task = self.today_task_mut(task_id)?;
        let subtasks = task.subtasks.get_or_insert_with(Vec::new);
        let mut millis = now.timestamp_millis();
        while subtasks.iter().any(|subtask| subtask.id == millis.to_string()) {
            millis += 1;
        }

        let subtask = Subtask::new(millis.to_string(), text);
        subtasks.push(subtask.clone());
        self.persist(DocumentPatch::tasks(self.doc.tasks.clone()));
        Ok(subtask)
    }

    pub fn toggle_subtask(&mut self, task_id: &str, subtask_id: &str) -> ServiceResult<bool> {
        let subtask = self.subtask_mut(task_id, subtask_id)?;
        subtask.completed = !subtask.completed;
        let completed = subtask.completed;
        self.persist(DocumentPatch::tasks(self.doc.tasks.clone()));
        Ok(completed)
    }

    pub fn edit_subtask(&mut self, task_id: &str, subtask_id: &str, text: &str) -> ServiceResult<()> {
        let text = non_empty(text)?;
        self.subtask_mut(task_id, subtask_id)?.text = text;
        self.persist(DocumentPatch::tasks(self.doc.tasks.clone()));
        Ok(())
    }

    pub fn delete_subtask(&mut self, task_id: &str, subtask_id: &str) -> ServiceResult<()> {
        let task = self.today_task_mut(task_id)?;
        let Some(index) = task
            .subtask_list()
            .iter()
            .position(|subtask| subtask.id == subtask_id)
        else {
            return Err(ServiceError::SubtaskNotFound {
                task_id: task_id.to_string(),
                subtask_id: subtask_id.to_string(),
            });
        };
        let subtasks = task.subtasks.get_or_insert_with(Vec::new);
        subtasks.remove(index);
        if subtasks.is_empty() {
            task.subtasks = None;
        }
        self.persist(DocumentPatch::tasks(self.doc.tasks.clone()));
        Ok(())
    }

    /// Moves a task from today or history into the trash.
    pub fn delete_task(&mut self, id: &str, now: DateTime<Local>) -> ServiceResult<()> {
        let mut patch = DocumentPatch::default();
        let task = match self.locate(id)? {
            TaskLocation::Today(index) => {
                let task = self.doc.tasks.remove(index);
                patch.tasks = Some(self.doc.tasks.clone());
                task
            }
            TaskLocation::History { day, index } => {
                let task = self.doc.history[day].tasks.remove(index);
                if self.doc.history[day].tasks.is_empty() {
                    self.doc.history.remove(day);
                }
                patch.history = Some(self.doc.history.clone());
                task
            }
        };

        self.doc.deleted_tasks.push(DeletedTask {
            task,
            deleted_at: now.timestamp_millis(),
        });
        patch.deleted_tasks = Some(self.doc.deleted_tasks.clone());
        info!("event=task_delete module=service status=ok task_id={id}");
        self.persist(patch);
        Ok(())
    }

    /// Returns a trashed task to today's working set.
    pub fn restore_task(&mut self, id: &str) -> ServiceResult<()> {
        let index = self.trash_index(id)?;
        let deleted = self.doc.deleted_tasks.remove(index);
        self.doc.tasks.push(deleted.task);
        info!("event=task_restore module=service status=ok task_id={id}");
        self.persist(DocumentPatch {
            tasks: Some(self.doc.tasks.clone()),
            deleted_tasks: Some(self.doc.deleted_tasks.clone()),
            ..DocumentPatch::default()
        });
        Ok(())
    }

    /// Permanently removes one trashed task.
    pub fn purge_task(&mut self, id: &str) -> ServiceResult<()> {
        let index = self.trash_index(id)?;
        self.doc.deleted_tasks.remove(index);
        info!("event=trash_purge module=service status=ok task_id={id}");
        self.persist_trash();
        Ok(())
    }

    /// Permanently removes every trashed task. Returns how many were removed.
    pub fn empty_trash(&mut self) -> usize {
        let removed = self.doc.deleted_tasks.len();
        if removed == 0 {
            return 0;
        }
        self.doc.deleted_tasks.clear();
        info!("event=trash_purge module=service status=ok count={removed}");
        self.persist_trash();
        removed
    }

    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        search_timeline(&self.doc.tasks, &self.doc.history, query)
    }

    /// Snapshot of the full document, fired-reminder set included.
    pub fn export_document(&self) -> AppDocument {
        let mut doc = self.doc.clone();
        doc.fired_reminders = self.fired.fired_keys();
        doc
    }

    /// Replaces tasks, history and trash with `doc`, then reconciles.
    pub fn import_document(&mut self, doc: AppDocument, now: DateTime<Local>) -> ReconcileReport {
        self.doc.tasks = doc.tasks;
        self.doc.history = doc.history;
        self.doc.deleted_tasks = doc.deleted_tasks;

        let today = day_key_of(&now);
        let reconciled = reconcile(self.take_timeline(), &today);
        self.put_timeline(reconciled.timeline);
        info!(
            "event=import module=service status=ok tasks={} history_days={} migrated={} repaired={}",
            self.doc.tasks.len(),
            self.doc.history.len(),
            reconciled.report.migrated,
            reconciled.report.repaired
        );
        self.persist(DocumentPatch {
            tasks: Some(self.doc.tasks.clone()),
            history: Some(self.doc.history.clone()),
            deleted_tasks: Some(self.doc.deleted_tasks.clone()),
            ..DocumentPatch::default()
        });
        reconciled.report
    }

    fn take_timeline(&mut self) -> Timeline {
        Timeline::new(
            std::mem::take(&mut self.doc.tasks),
            std::mem::take(&mut self.doc.history),
        )
    }

    fn put_timeline(&mut self, timeline: Timeline) {
        self.doc.tasks = timeline.tasks;
        self.doc.history = timeline.history;
    }

    fn locate(&self, id: &str) -> ServiceResult<TaskLocation> {
        if let Some(index) = self.doc.tasks.iter().position(|task| task.id == id) {
            return Ok(TaskLocation::Today(index));
        }
        for (day, history_day) in self.doc.history.iter().enumerate() {
            if let Some(index) = history_day.tasks.iter().position(|task| task.id == id) {
                return Ok(TaskLocation::History { day, index });
            }
        }
        Err(ServiceError::TaskNotFound(id.to_string()))
    }

    fn id_in_use(&self, id: &str) -> bool {
        self.locate(id).is_ok() || self.trash_index(id).is_ok()
    }

    fn today_task_mut(&mut self, id: &str) -> ServiceResult<&mut Task> {
        self.doc
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| ServiceError::TaskNotFound(id.to_string()))
    }

    fn subtask_mut(&mut self, task_id: &str, subtask_id: &str) -> ServiceResult<&mut Subtask> {
        self.today_task_mut(task_id)?
            .subtasks
            .iter_mut()
            .flatten()
            .find(|subtask| subtask.id == subtask_id)
            .ok_or_else(|| ServiceError::SubtaskNotFound {
                task_id: task_id.to_string(),
                subtask_id: subtask_id.to_string(),
            })
    }

    fn trash_index(&self, id: &str) -> ServiceResult<usize> {
        self.doc
            .deleted_tasks
            .iter()
            .position(|deleted| deleted.task.id == id)
            .ok_or_else(|| ServiceError::TaskNotFound(id.to_string()))
    }

    fn sync_fired_reminders(&mut self) {
        self.doc.fired_reminders = self.fired.fired_keys();
        self.persist(DocumentPatch::fired_reminders(
            self.doc.fired_reminders.clone(),
        ));
    }

    fn persist_timeline(&mut self) {
        self.persist(DocumentPatch::timeline(
            self.doc.tasks.clone(),
            self.doc.history.clone(),
        ));
    }

    fn persist_trash(&mut self) {
        self.persist(DocumentPatch {
            deleted_tasks: Some(self.doc.deleted_tasks.clone()),
            ..DocumentPatch::default()
        });
    }

    fn persist(&mut self, patch: DocumentPatch) {
        match self.repo.save(&patch) {
            Ok(()) => self.unsaved.forget(&patch),
            Err(err) => {
                error!(
                    "event=doc_save module=service status=error fields={} error={}",
                    patch.field_names().join(","),
                    err
                );
                self.unsaved.merge(patch);
            }
        }
    }
}

fn non_empty(text: &str) -> ServiceResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::EmptyText);
    }
    Ok(trimmed.to_string())
}
