//! Task, subtask and history-day records.
//!
//! # Responsibility
//! - Mirror the JSON wire shape written by the desktop shell (`camelCase`).
//! - Carry every unrecognized field in `extra` so records survive migration
//!   verbatim.
//!
//! # Invariants
//! - `id` is always a string; numeric IDs found in persisted data are
//!   normalized to their decimal form, and any other scalar keeps its JSON
//!   text so the task stays loadable.
//! - One undecodable element in a task list is dropped on its own; its
//!   siblings still load.
//! - History tasks are expected to be completed; the reconciler repairs
//!   violations instead of rejecting them.

use log::warn;
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Stable task identifier. Timestamp-like IDs encode creation time.
pub type TaskId = String;

/// Calendar-day label such as `14 Mar`, used as the history grouping key.
pub type DayKey = String;

/// One to-do item in today's working set, history or trash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: TaskId,
    /// User content. May embed attachment/code-block markup.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: bool,
    /// Time-of-day reminder in `HH:MM`; recurs every day the task is visible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder: Option<String>,
    /// Opaque attachment reference owned by the presentation layer.
    /// `Some(Value::Null)` is a stored `null`, kept as written.
    #[serde(default, deserialize_with = "deserialize_present")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Value>,
    #[serde(default, deserialize_with = "deserialize_lenient_subtasks")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<Vec<Subtask>>,
    /// Legacy single-project label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Fields this crate does not interpret, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    /// Creates an incomplete, non-priority task.
    pub fn new(id: impl Into<TaskId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            completed: false,
            priority: false,
            reminder: None,
            attachment: None,
            subtasks: None,
            project: None,
            projects: None,
            due_date: None,
            extra: Map::new(),
        }
    }

    /// Returns the text shown to the user.
    ///
    /// Tasks created by the old HTTP shim stored their content in `title`.
    pub fn display_text(&self) -> &str {
        if !self.text.is_empty() {
            return self.text.as_str();
        }
        self.extra
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Returns all project labels, folding the legacy single `project` in.
    pub fn project_labels(&self) -> Vec<&str> {
        match (&self.projects, &self.project) {
            (Some(projects), _) => projects.iter().map(String::as_str).collect(),
            (None, Some(project)) => vec![project.as_str()],
            (None, None) => Vec::new(),
        }
    }

    pub fn subtask_list(&self) -> &[Subtask] {
        self.subtasks.as_deref().unwrap_or_default()
    }

    pub fn has_attachment(&self) -> bool {
        self.attachment.as_ref().is_some_and(|value| !value.is_null())
    }
}

/// Checklist item embedded in a parent task. Never migrated on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: TaskId,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, deserialize_with = "deserialize_present")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Subtask {
    pub fn new(id: impl Into<TaskId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            completed: false,
            attachment: None,
            extra: Map::new(),
        }
    }
}

/// Archived tasks of one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryDay {
    /// Unique across the history sequence.
    pub date: DayKey,
    #[serde(default, deserialize_with = "deserialize_lenient_list")]
    pub tasks: Vec<Task>,
}

impl HistoryDay {
    pub fn new(date: impl Into<DayKey>, tasks: Vec<Task>) -> Self {
        Self {
            date: date.into(),
            tasks,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.iter().any(|task| task.id == id)
    }
}

/// Soft-deleted task kept in the trash for undo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedTask {
    #[serde(flatten)]
    pub task: Task,
    /// Unix epoch milliseconds of deletion.
    #[serde(default)]
    pub deleted_at: i64,
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<TaskId, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(id) => id,
        Value::Number(number) => number_id(&number),
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn number_id(number: &Number) -> TaskId {
    match number.as_f64() {
        Some(value) if number.is_f64() && value.fract() == 0.0 && value.is_finite() => {
            format!("{value:.0}")
        }
        _ => number.to_string(),
    }
}

/// Keeps an explicit `null` as `Some(Value::Null)` instead of folding it
/// into an absent field.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Decodes list elements one by one, dropping only those that do not decode.
pub fn decode_elements<T: DeserializeOwned>(field: &str, raw: Vec<Value>) -> Vec<T> {
    let mut items = Vec::with_capacity(raw.len());
    for (index, value) in raw.into_iter().enumerate() {
        match serde_json::from_value(value) {
            Ok(item) => items.push(item),
            Err(err) => warn!(
                "event=doc_load module=model status=skip field={} index={} error_code=corrupt_element error={}",
                field, index, err
            ),
        }
    }
    items
}

pub(crate) fn deserialize_lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Vec::<Value>::deserialize(deserializer).map(|raw| decode_elements("list", raw))
}

fn deserialize_lenient_subtasks<'de, D>(deserializer: D) -> Result<Option<Vec<Subtask>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<Value>>::deserialize(deserializer)
        .map(|raw| raw.map(|raw| decode_elements("subtasks", raw)))
}

#[cfg(test)]
mod tests {
    use super::{DeletedTask, HistoryDay, Task};
    use serde_json::json;

    #[test]
    fn unknown_fields_survive_roundtrip() {
        let value = json!({
            "id": "1700000000000",
            "text": "ship it",
            "completed": true,
            "priority": false,
            "color": "teal",
            "meta": {"pinned": true}
        });

        let task: Task = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(task.extra.get("color"), Some(&json!("teal")));
        assert_eq!(serde_json::to_value(&task).unwrap(), value);
    }

    #[test]
    fn numeric_id_is_normalized_to_string() {
        let task: Task = serde_json::from_value(json!({"id": 1700000000000_i64})).unwrap();
        assert_eq!(task.id, "1700000000000");
        assert!(!task.completed);
    }

    #[test]
    fn legacy_shim_task_falls_back_to_title() {
        let task: Task = serde_json::from_value(json!({
            "id": "k3j9x2a",
            "title": "Buy milk",
            "done": false,
            "createdAt": "2025-01-01T00:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(task.display_text(), "Buy milk");
        assert!(task.extra.contains_key("createdAt"));
    }

    #[test]
    fn deleted_task_keeps_deleted_at_out_of_extra() {
        let deleted: DeletedTask = serde_json::from_value(json!({
            "id": "1700000000000",
            "text": "gone",
            "completed": false,
            "priority": true,
            "deletedAt": 1700000100000_i64
        }))
        .unwrap();

        assert_eq!(deleted.deleted_at, 1_700_000_100_000);
        assert!(deleted.task.extra.is_empty());
        assert!(deleted.task.priority);
    }

    #[test]
    fn project_labels_fold_legacy_project() {
        let mut task = Task::new("1", "x");
        task.project = Some("home".to_string());
        assert_eq!(task.project_labels(), vec!["home"]);

        task.projects = Some(vec!["work".to_string(), "ops".to_string()]);
        assert_eq!(task.project_labels(), vec!["work", "ops"]);
    }

    #[test]
    fn odd_scalar_ids_still_load() {
        let cases = [
            (json!(1.5), "1.5"),
            (json!(1700000000000.0), "1700000000000"),
            (json!(null), ""),
            (json!(true), "true"),
        ];
        for (id, expected) in cases {
            let task: Task = serde_json::from_value(json!({"id": id, "text": "t"})).unwrap();
            assert_eq!(task.id, expected);
        }

        let task: Task = serde_json::from_value(json!({"text": "no id"})).unwrap();
        assert_eq!(task.id, "");
    }

    #[test]
    fn explicit_null_attachment_survives_roundtrip() {
        let value = json!({
            "id": "1700000000000",
            "text": "x",
            "completed": false,
            "priority": false,
            "attachment": null
        });

        let task: Task = serde_json::from_value(value.clone()).unwrap();
        assert!(!task.has_attachment());
        assert_eq!(serde_json::to_value(&task).unwrap(), value);

        let bare: Task = serde_json::from_value(json!({"id": "1"})).unwrap();
        assert!(bare.attachment.is_none());
        assert!(serde_json::to_value(&bare).unwrap().get("attachment").is_none());
    }

    #[test]
    fn history_day_skips_only_the_broken_task() {
        let day: HistoryDay = serde_json::from_value(json!({
            "date": "14 Mar",
            "tasks": [
                {"id": "1710417600000", "text": "kept", "completed": true,
                 "subtasks": [{"id": "1", "text": "step"}, {"id": "2", "completed": 3}]},
                "not a task",
                {"id": "1710417600001", "text": 5}
            ]
        }))
        .unwrap();

        assert_eq!(day.tasks.len(), 1);
        assert_eq!(day.tasks[0].text, "kept");
        assert_eq!(day.tasks[0].subtask_list().len(), 1);
    }
}
