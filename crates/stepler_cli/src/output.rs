use chrono::{Local, TimeZone};
use stepler_core::{DeletedTask, HistoryDay, SearchHit, Task};

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn checkbox(completed: bool) -> char {
    if completed {
        'x'
    } else {
        ' '
    }
}

/// Format a single task as a one-line summary
pub fn format_task_line(task: &Task) -> String {
    let mut line = format!(
        "[{}] {}{} {}",
        checkbox(task.completed),
        if task.priority { "! " } else { "" },
        task.id,
        task.display_text()
    );
    let projects = task.project_labels();
    if !projects.is_empty() {
        let tags: Vec<String> = projects.iter().map(|p| format!("@{p}")).collect();
        line.push(' ');
        line.push_str(&tags.join(" "));
    }
    if let Some(reminder) = task.reminder.as_deref().filter(|r| !r.is_empty()) {
        line.push_str(&format!(" (remind {reminder})"));
    }
    if let Some(due) = task.due_date.as_deref() {
        line.push_str(&format!(" (due {due})"));
    }
    if task.has_attachment() {
        line.push_str(" +file");
    }
    line
}

/// Format a task with its subtasks, indented
pub fn format_task_tree(task: &Task, indent: usize) -> Vec<String> {
    let prefix = "  ".repeat(indent);
    let mut lines = vec![format!("{prefix}{}", format_task_line(task))];
    for subtask in task.subtask_list() {
        lines.push(format!(
            "{prefix}  [{}] {} {}",
            checkbox(subtask.completed),
            subtask.id,
            subtask.text
        ));
    }
    lines
}

pub fn format_history_day(day: &HistoryDay) -> Vec<String> {
    let mut lines = vec![format!("{} ({})", day.date, day.tasks.len())];
    for task in &day.tasks {
        lines.extend(format_task_tree(task, 1));
    }
    lines
}

pub fn format_deleted_line(deleted: &DeletedTask) -> String {
    let when = Local
        .timestamp_millis_opt(deleted.deleted_at)
        .earliest()
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!("{}  deleted {when}", format_task_line(&deleted.task))
}

pub fn format_hit_line(hit: &SearchHit) -> String {
    format!("{:<7} {}", hit.date_label, format_task_line(&hit.task))
}
