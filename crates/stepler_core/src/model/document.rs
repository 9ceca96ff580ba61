//! Whole-document shape persisted by the store.
//!
//! # Responsibility
//! - Define the persisted `{tasks, history, deletedTasks, firedReminders}`
//!   document and the partial patch used for merge-on-save writes.
//!
//! # Invariants
//! - Missing fields deserialize to empty defaults.
//! - A broken task or day is dropped alone; the rest of its list loads.
//! - Unknown top-level keys (e.g. legacy `currentDate`) are preserved.

use crate::model::task::{deserialize_lenient_list, DeletedTask, HistoryDay, Task};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Persisted application document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDocument {
    /// Today's working set; may hold completed and incomplete tasks.
    #[serde(default, deserialize_with = "deserialize_lenient_list")]
    pub tasks: Vec<Task>,
    /// Archived days, oldest first.
    #[serde(default, deserialize_with = "deserialize_lenient_list")]
    pub history: Vec<HistoryDay>,
    #[serde(default, deserialize_with = "deserialize_lenient_list")]
    pub deleted_tasks: Vec<DeletedTask>,
    /// Serialized set of `<taskId>-<HH:MM>` keys delivered today.
    #[serde(default)]
    pub fired_reminders: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppDocument {
    /// Overwrites every field present in `patch`, leaving the rest untouched.
    pub fn apply(&mut self, patch: &DocumentPatch) {
        if let Some(tasks) = &patch.tasks {
            self.tasks = tasks.clone();
        }
        if let Some(history) = &patch.history {
            self.history = history.clone();
        }
        if let Some(deleted_tasks) = &patch.deleted_tasks {
            self.deleted_tasks = deleted_tasks.clone();
        }
        if let Some(fired_reminders) = &patch.fired_reminders {
            self.fired_reminders = fired_reminders.clone();
        }
    }

    /// Counts tasks across today and history (trash excluded).
    pub fn timeline_len(&self) -> usize {
        self.tasks.len() + self.history.iter().map(|day| day.tasks.len()).sum::<usize>()
    }
}

/// Partial document write. `None` fields are left as stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentPatch {
    pub tasks: Option<Vec<Task>>,
    pub history: Option<Vec<HistoryDay>>,
    pub deleted_tasks: Option<Vec<DeletedTask>>,
    pub fired_reminders: Option<Vec<String>>,
}

impl DocumentPatch {
    pub fn tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Some(tasks),
            ..Self::default()
        }
    }

    pub fn timeline(tasks: Vec<Task>, history: Vec<HistoryDay>) -> Self {
        Self {
            tasks: Some(tasks),
            history: Some(history),
            ..Self::default()
        }
    }

    pub fn fired_reminders(keys: Vec<String>) -> Self {
        Self {
            fired_reminders: Some(keys),
            ..Self::default()
        }
    }

    /// Folds `newer` in; its present fields win.
    pub fn merge(&mut self, newer: DocumentPatch) {
        if newer.tasks.is_some() {
            self.tasks = newer.tasks;
        }
        if newer.history.is_some() {
            self.history = newer.history;
        }
        if newer.deleted_tasks.is_some() {
            self.deleted_tasks = newer.deleted_tasks;
        }
        if newer.fired_reminders.is_some() {
            self.fired_reminders = newer.fired_reminders;
        }
    }

    /// Drops every field that `written` carries.
    pub fn forget(&mut self, written: &DocumentPatch) {
        if written.tasks.is_some() {
            self.tasks = None;
        }
        if written.history.is_some() {
            self.history = None;
        }
        if written.deleted_tasks.is_some() {
            self.deleted_tasks = None;
        }
        if written.fired_reminders.is_some() {
            self.fired_reminders = None;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_none()
            && self.history.is_none()
            && self.deleted_tasks.is_none()
            && self.fired_reminders.is_none()
    }

    /// Names of the fields this patch writes, in storage key form.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.tasks.is_some() {
            names.push("tasks");
        }
        if self.history.is_some() {
            names.push("history");
        }
        if self.deleted_tasks.is_some() {
            names.push("deletedTasks");
        }
        if self.fired_reminders.is_some() {
            names.push("firedReminders");
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::{AppDocument, DocumentPatch};
    use crate::model::task::Task;
    use serde_json::json;

    #[test]
    fn missing_fields_default_to_empty() {
        let doc: AppDocument = serde_json::from_value(json!({})).unwrap();
        assert_eq!(doc, AppDocument::default());
    }

    #[test]
    fn legacy_top_level_keys_are_preserved() {
        let doc: AppDocument =
            serde_json::from_value(json!({"tasks": [], "currentDate": "Mon Mar 14"})).unwrap();
        let encoded = serde_json::to_value(&doc).unwrap();
        assert_eq!(encoded["currentDate"], "Mon Mar 14");
        assert_eq!(encoded["deletedTasks"], json!([]));
    }

    #[test]
    fn broken_list_elements_are_dropped_alone() {
        let doc: AppDocument = serde_json::from_value(json!({
            "tasks": [{"id": "1741953600000", "text": "keep me"}, 42],
            "deletedTasks": [{"id": "2", "text": "gone", "deletedAt": 5}, {"id": "3", "completed": "no"}]
        }))
        .unwrap();

        assert_eq!(doc.tasks.len(), 1);
        assert_eq!(doc.tasks[0].text, "keep me");
        assert_eq!(doc.deleted_tasks.len(), 1);
        assert_eq!(doc.deleted_tasks[0].task.id, "2");
    }

    #[test]
    fn apply_only_overwrites_patched_fields() {
        let mut doc = AppDocument {
            fired_reminders: vec!["1-09:00".to_string()],
            ..AppDocument::default()
        };

        doc.apply(&DocumentPatch::tasks(vec![Task::new("1", "a")]));

        assert_eq!(doc.tasks.len(), 1);
        assert_eq!(doc.fired_reminders, vec!["1-09:00".to_string()]);
    }

    #[test]
    fn merge_and_forget_track_pending_fields() {
        let mut pending = DocumentPatch::tasks(vec![Task::new("1", "a")]);
        pending.merge(DocumentPatch::fired_reminders(vec!["1-09:00".to_string()]));
        pending.merge(DocumentPatch::tasks(vec![Task::new("2", "b")]));
        assert_eq!(pending.field_names(), vec!["tasks", "firedReminders"]);
        assert_eq!(pending.tasks.as_ref().map(|tasks| tasks[0].id.as_str()), Some("2"));

        pending.forget(&DocumentPatch::timeline(Vec::new(), Vec::new()));
        assert_eq!(pending.field_names(), vec!["firedReminders"]);
    }

    #[test]
    fn field_names_follow_wire_names() {
        let patch = DocumentPatch {
            deleted_tasks: Some(Vec::new()),
            fired_reminders: Some(Vec::new()),
            ..DocumentPatch::default()
        };
        assert_eq!(patch.field_names(), vec!["deletedTasks", "firedReminders"]);
        assert!(DocumentPatch::default().is_empty());
    }
}
