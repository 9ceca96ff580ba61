//! In-memory timeline search.
//!
//! # Responsibility
//! - Match a free-text query against today's tasks and every history day.
//!
//! # Invariants
//! - Matching is case-insensitive substring over display text, project
//!   labels and subtask text.
//! - Incomplete hits come first, then newest ID first.

use crate::model::task::{HistoryDay, Task};
use crate::timeline::day_key::ordering_timestamp;
use std::cmp::Reverse;

/// Label attached to hits from today's working set.
pub const TODAY_LABEL: &str = "Today";

/// One matching task and where it lives.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub task: Task,
    /// `Today` or the history day key.
    pub date_label: String,
}

/// Searches today's tasks and history. Blank queries return nothing.
pub fn search_timeline(tasks: &[Task], history: &[HistoryDay], query: &str) -> Vec<SearchHit> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let today = tasks.iter().map(|task| (task, TODAY_LABEL));
    let archived = history
        .iter()
        .flat_map(|day| day.tasks.iter().map(move |task| (task, day.date.as_str())));

    let mut hits: Vec<SearchHit> = today
        .chain(archived)
        .filter(|(task, _)| matches_query(task, &needle))
        .map(|(task, label)| SearchHit {
            task: task.clone(),
            date_label: label.to_string(),
        })
        .collect();

    hits.sort_by_key(|hit| (hit.task.completed, Reverse(ordering_timestamp(&hit.task.id))));
    hits
}

fn matches_query(task: &Task, needle: &str) -> bool {
    task.display_text().to_lowercase().contains(needle)
        || task
            .project_labels()
            .iter()
            .any(|project| project.to_lowercase().contains(needle))
        || task
            .subtask_list()
            .iter()
            .any(|subtask| subtask.text.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::{search_timeline, TODAY_LABEL};
    use crate::model::task::{HistoryDay, Subtask, Task};

    #[test]
    fn blank_query_returns_nothing() {
        let tasks = vec![Task::new("1", "anything")];
        assert!(search_timeline(&tasks, &[], "   ").is_empty());
    }

    #[test]
    fn matches_text_projects_and_subtasks() {
        let mut by_project = Task::new("10000000003", "plain");
        by_project.projects = Some(vec!["Garden".to_string()]);
        let mut by_subtask = Task::new("10000000002", "other");
        by_subtask.subtasks = Some(vec![Subtask::new("s1", "water the garden")]);
        let mut archived = Task::new("10000000001", "Garden fence");
        archived.completed = true;

        let hits = search_timeline(
            &[by_project, by_subtask, Task::new("10000000004", "unrelated")],
            &[HistoryDay::new("3 Feb", vec![archived])],
            "GARDEN",
        );

        let ids: Vec<&str> = hits.iter().map(|hit| hit.task.id.as_str()).collect();
        assert_eq!(ids, vec!["10000000003", "10000000002", "10000000001"]);
        assert_eq!(hits[0].date_label, TODAY_LABEL);
        assert_eq!(hits[2].date_label, "3 Feb");
    }
}
