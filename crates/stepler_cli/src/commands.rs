use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "stepler",
    about = concat!("stepler v", env!("CARGO_PKG_VERSION"), " - today's tasks, yesterday's history"),
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Store file (default: $STEPLER_DB_PATH or the temp dir)
    #[arg(long, global = true)]
    pub db: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List today's tasks
    List,
    /// Show archived days
    History(HistoryArgs),
    /// Add a task to today
    Add(TextArgs),
    /// Toggle a task's completion
    Done(IdArg),
    /// Toggle a task's priority flag
    Priority(IdArg),
    /// Change a task's text
    Edit(EditArgs),
    /// Set or clear a daily HH:MM reminder
    Remind(RemindArgs),
    /// Set a task's project labels
    Project(ProjectArgs),
    /// Set or clear a task's due date
    Due(DueArgs),
    /// Drop a task's attachment
    Detach(IdArg),
    /// Manage subtasks
    Subtask(SubtaskCmd),
    /// Move a task to the trash
    Delete(IdArg),
    /// List trashed tasks
    Trash,
    /// Return a trashed task to today
    Restore(IdArg),
    /// Permanently delete one trashed task
    Purge(IdArg),
    /// Permanently delete every trashed task
    EmptyTrash,
    /// Search today and history
    Search(SearchArgs),
    /// Re-run the today/history partition now
    Reconcile,
    /// Write the whole document as JSON
    Export(ExportArgs),
    /// Replace tasks, history and trash from a JSON document
    Import(ImportArgs),
    /// Run the rollover, reminder and midnight timers
    Run(RunArgs),
}

#[derive(Args)]
pub struct IdArg {
    /// Task ID
    pub id: String,
}

#[derive(Args)]
pub struct TextArgs {
    /// Task text
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,
}

#[derive(Args)]
pub struct HistoryArgs {
    /// Only show this many most recent days
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID
    pub id: String,
    /// New text
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,
}

#[derive(Args)]
pub struct RemindArgs {
    /// Task ID
    pub id: String,
    /// Reminder time, 24h HH:MM
    #[arg(required_unless_present = "clear", conflicts_with = "clear")]
    pub time: Option<String>,
    /// Remove the reminder
    #[arg(long)]
    pub clear: bool,
}

#[derive(Args)]
pub struct ProjectArgs {
    /// Task ID
    pub id: String,
    /// Project labels (none clears them)
    pub projects: Vec<String>,
}

#[derive(Args)]
pub struct DueArgs {
    /// Task ID
    pub id: String,
    /// Due date, YYYY-MM-DD
    #[arg(required_unless_present = "clear", conflicts_with = "clear")]
    pub date: Option<String>,
    /// Remove the due date
    #[arg(long)]
    pub clear: bool,
}

#[derive(Args)]
pub struct SubtaskCmd {
    #[command(subcommand)]
    pub action: SubtaskAction,
}

#[derive(Subcommand)]
pub enum SubtaskAction {
    /// Add a subtask
    Add(SubtaskAddArgs),
    /// Toggle a subtask's completion
    Done(SubtaskIdArgs),
    /// Change a subtask's text
    Edit(SubtaskEditArgs),
    /// Remove a subtask
    Rm(SubtaskIdArgs),
}

#[derive(Args)]
pub struct SubtaskAddArgs {
    /// Parent task ID
    pub task_id: String,
    /// Subtask text
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,
}

#[derive(Args)]
pub struct SubtaskIdArgs {
    /// Parent task ID
    pub task_id: String,
    /// Subtask ID
    pub subtask_id: String,
}

#[derive(Args)]
pub struct SubtaskEditArgs {
    /// Parent task ID
    pub task_id: String,
    /// Subtask ID
    pub subtask_id: String,
    /// New text
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Text to look for in tasks, projects and subtasks
    pub query: String,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Output file (default: stdout)
    pub path: Option<String>,
}

#[derive(Args)]
pub struct ImportArgs {
    /// JSON document to import
    pub path: String,
}

#[derive(Args)]
pub struct RunArgs {
    /// Run due checks once and exit
    #[arg(long)]
    pub once: bool,
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands, SubtaskAction};
    use clap::Parser;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["stepler", "add", "buy", "milk", "--json", "--db", "/tmp/s.db"])
            .unwrap();

        assert!(cli.json);
        assert_eq!(cli.db.as_deref(), Some("/tmp/s.db"));
        match cli.command {
            Commands::Add(args) => assert_eq!(args.text.join(" "), "buy milk"),
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn remind_requires_time_or_clear() {
        assert!(Cli::try_parse_from(["stepler", "remind", "1"]).is_err());
        assert!(Cli::try_parse_from(["stepler", "remind", "1", "09:00", "--clear"]).is_err());

        let cli = Cli::try_parse_from(["stepler", "remind", "1", "--clear"]).unwrap();
        match cli.command {
            Commands::Remind(args) => {
                assert!(args.clear);
                assert_eq!(args.time, None);
            }
            _ => panic!("expected remind"),
        }
    }

    #[test]
    fn parses_nested_subtask_actions() {
        let cli = Cli::try_parse_from(["stepler", "subtask", "rm", "1", "2"]).unwrap();
        match cli.command {
            Commands::Subtask(cmd) => match cmd.action {
                SubtaskAction::Rm(args) => {
                    assert_eq!(args.task_id, "1");
                    assert_eq!(args.subtask_id, "2");
                }
                _ => panic!("expected rm"),
            },
            _ => panic!("expected subtask"),
        }
    }

    #[test]
    fn empty_trash_uses_kebab_case() {
        let cli = Cli::try_parse_from(["stepler", "empty-trash"]).unwrap();
        assert!(matches!(cli.command, Commands::EmptyTrash));
    }
}
