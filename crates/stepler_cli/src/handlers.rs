use std::path::PathBuf;
use std::time::Instant;

use chrono::Local;
use log::{info, warn};
use serde_json::json;
use stepler_core::db::open_db;
use stepler_core::{
    init_from_config, CoreConfig, DocumentRepository, FallbackNotifier, JsonFileDocumentRepository,
    Notifier, ReconcileReport, Scheduler, SqliteDocumentRepository, TimelineService, TimerKind,
};

use crate::commands::*;
use crate::notify::{DesktopNotifier, TerminalNotifier};
use crate::output::*;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CliResult {
    let mut config = CoreConfig::from_env();
    if let Some(db) = cli.db {
        config.db_path = PathBuf::from(db);
    }
    start_logging(&config);

    let conn = open_db(&config.db_path)?;
    let repo = SqliteDocumentRepository::try_new(&conn)?;
    let mut service = TimelineService::open(repo, Local::now());
    let json = cli.json;

    match cli.command {
        // Read commands
        Commands::List => cmd_list(&service, json),
        Commands::History(args) => cmd_history(&service, args, json),
        Commands::Trash => cmd_trash(&service, json),
        Commands::Search(args) => cmd_search(&service, args, json),
        Commands::Export(args) => cmd_export(&service, args),

        // Task commands
        Commands::Add(args) => {
            let task = service.add_task(&args.text.join(" "), Local::now())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&task)?);
            } else {
                println!("Added {}", format_task_line(&task));
            }
            Ok(())
        }
        Commands::Done(args) => {
            let completed = service.toggle_task(&args.id, Local::now())?;
            report_flag(json, &args.id, "completed", completed);
            Ok(())
        }
        Commands::Priority(args) => {
            let priority = service.toggle_priority(&args.id)?;
            report_flag(json, &args.id, "priority", priority);
            Ok(())
        }
        Commands::Edit(args) => {
            service.edit_text(&args.id, &args.text.join(" "))?;
            report_ok(json, &args.id, "edited");
            Ok(())
        }
        Commands::Remind(args) => {
            let time = if args.clear { None } else { args.time.as_deref() };
            service.set_reminder(&args.id, time)?;
            report_ok(json, &args.id, "reminder set");
            Ok(())
        }
        Commands::Project(args) => {
            service.set_projects(&args.id, args.projects)?;
            report_ok(json, &args.id, "projects set");
            Ok(())
        }
        Commands::Due(args) => {
            let date = if args.clear { None } else { args.date };
            service.set_due_date(&args.id, date)?;
            report_ok(json, &args.id, "due date set");
            Ok(())
        }
        Commands::Detach(args) => {
            service.remove_attachment(&args.id)?;
            report_ok(json, &args.id, "attachment removed");
            Ok(())
        }
        Commands::Subtask(cmd) => cmd_subtask(&mut service, cmd, json),

        // Trash commands
        Commands::Delete(args) => {
            service.delete_task(&args.id, Local::now())?;
            report_ok(json, &args.id, "moved to trash");
            Ok(())
        }
        Commands::Restore(args) => {
            service.restore_task(&args.id)?;
            report_ok(json, &args.id, "restored");
            Ok(())
        }
        Commands::Purge(args) => {
            service.purge_task(&args.id)?;
            report_ok(json, &args.id, "deleted permanently");
            Ok(())
        }
        Commands::EmptyTrash => {
            let removed = service.empty_trash();
            if json {
                println!("{}", json!({ "removed": removed }));
            } else {
                println!("Removed {removed} task(s) from the trash");
            }
            Ok(())
        }

        // Maintenance
        Commands::Reconcile => {
            let report = service.reconcile_now(Local::now());
            print_report(&report, json);
            Ok(())
        }
        Commands::Import(args) => {
            let doc = JsonFileDocumentRepository::new(&args.path).read_strict()?;
            let report = service.import_document(doc, Local::now());
            print_report(&report, json);
            Ok(())
        }
        Commands::Run(args) => cmd_run(&mut service, &config, args),
    }
}

fn start_logging(config: &CoreConfig) {
    if let Err(err) = init_from_config(config) {
        eprintln!("warning: logging disabled: {err}");
    }
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list<R: DocumentRepository>(service: &TimelineService<R>, json: bool) -> CliResult {
    if json {
        println!("{}", serde_json::to_string_pretty(service.tasks())?);
        return Ok(());
    }
    if service.tasks().is_empty() {
        println!("No tasks for today");
        return Ok(());
    }
    for task in service.tasks() {
        for line in format_task_tree(task, 0) {
            println!("{line}");
        }
    }
    Ok(())
}

fn cmd_history<R: DocumentRepository>(
    service: &TimelineService<R>,
    args: HistoryArgs,
    json: bool,
) -> CliResult {
    let history = service.history();
    let skip = args
        .limit
        .map_or(0, |limit| history.len().saturating_sub(limit));
    let days = &history[skip..];

    if json {
        println!("{}", serde_json::to_string_pretty(days)?);
        return Ok(());
    }
    for day in days {
        for line in format_history_day(day) {
            println!("{line}");
        }
    }
    Ok(())
}

fn cmd_trash<R: DocumentRepository>(service: &TimelineService<R>, json: bool) -> CliResult {
    if json {
        println!("{}", serde_json::to_string_pretty(service.deleted_tasks())?);
        return Ok(());
    }
    if service.deleted_tasks().is_empty() {
        println!("Trash is empty");
        return Ok(());
    }
    for deleted in service.deleted_tasks() {
        println!("{}", format_deleted_line(deleted));
    }
    Ok(())
}

fn cmd_search<R: DocumentRepository>(
    service: &TimelineService<R>,
    args: SearchArgs,
    json: bool,
) -> CliResult {
    let hits = service.search(&args.query);
    if json {
        let results: Vec<_> = hits
            .iter()
            .map(|hit| json!({ "date": hit.date_label, "task": hit.task }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    for hit in &hits {
        println!("{}", format_hit_line(hit));
    }
    Ok(())
}

fn cmd_export<R: DocumentRepository>(service: &TimelineService<R>, args: ExportArgs) -> CliResult {
    let doc = service.export_document();
    match args.path {
        Some(path) => {
            JsonFileDocumentRepository::new(&path).write_document(&doc)?;
            eprintln!("Exported {} task(s) to {path}", doc.timeline_len());
        }
        None => println!("{}", serde_json::to_string_pretty(&doc)?),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Subtasks
// ---------------------------------------------------------------------------

fn cmd_subtask<R: DocumentRepository>(
    service: &mut TimelineService<R>,
    cmd: SubtaskCmd,
    json: bool,
) -> CliResult {
    match cmd.action {
        SubtaskAction::Add(args) => {
            let subtask = service.add_subtask(&args.task_id, &args.text.join(" "), Local::now())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&subtask)?);
            } else {
                println!("Added subtask {} to {}", subtask.id, args.task_id);
            }
        }
        SubtaskAction::Done(args) => {
            let completed = service.toggle_subtask(&args.task_id, &args.subtask_id)?;
            report_flag(json, &args.subtask_id, "completed", completed);
        }
        SubtaskAction::Edit(args) => {
            service.edit_subtask(&args.task_id, &args.subtask_id, &args.text.join(" "))?;
            report_ok(json, &args.subtask_id, "edited");
        }
        SubtaskAction::Rm(args) => {
            service.delete_subtask(&args.task_id, &args.subtask_id)?;
            report_ok(json, &args.subtask_id, "removed");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

const ALL_CHECKS: [TimerKind; 3] = [TimerKind::Rollover, TimerKind::Reminder, TimerKind::Midnight];

fn cmd_run<R: DocumentRepository>(
    service: &mut TimelineService<R>,
    config: &CoreConfig,
    args: RunArgs,
) -> CliResult {
    let notifier = FallbackNotifier::new(DesktopNotifier, TerminalNotifier);
    if args.once {
        run_checks(service, &ALL_CHECKS, &notifier);
        return Ok(());
    }

    let mut scheduler = Scheduler::with_intervals(
        Instant::now(),
        config.rollover_interval,
        config.reminder_interval,
        config.midnight_interval,
    );
    info!(
        "event=scheduler_start module=cli status=ok rollover_s={} reminder_s={} midnight_s={}",
        config.rollover_interval.as_secs(),
        config.reminder_interval.as_secs(),
        config.midnight_interval.as_secs()
    );
    eprintln!("Watching {} (Ctrl-C to stop)", config.db_path.display());

    loop {
        let due = scheduler.poll(Instant::now());
        if !due.is_empty() {
            // One-shot commands may have written since the last batch.
            service.reload();
            run_checks(service, &due, &notifier);
        }

        let Some(deadline) = scheduler.next_deadline() else {
            warn!("event=scheduler_stop module=cli status=skip reason=no_timers");
            return Ok(());
        };
        std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
    }
}

fn run_checks<R: DocumentRepository, N: Notifier>(
    service: &mut TimelineService<R>,
    checks: &[TimerKind],
    notifier: &N,
) {
    for check in checks {
        let now = Local::now();
        match check {
            TimerKind::Rollover => {
                if let Some(report) = service.rollover_tick(now) {
                    eprintln!("Moved {} finished task(s) to history", report.migrated);
                }
            }
            TimerKind::Reminder => {
                service.reminder_tick(now, notifier);
            }
            TimerKind::Midnight => {
                service.midnight_tick(now);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Result output
// ---------------------------------------------------------------------------

fn report_ok(json: bool, id: &str, action: &str) {
    if json {
        println!("{}", json!({ "id": id, "status": action }));
    } else {
        println!("{id}: {action}");
    }
}

fn report_flag(json: bool, id: &str, flag: &str, value: bool) {
    if json {
        let mut body = serde_json::Map::new();
        body.insert("id".to_string(), json!(id));
        body.insert(flag.to_string(), json!(value));
        println!("{}", serde_json::Value::Object(body));
    } else {
        println!("{id}: {flag}={value}");
    }
}

fn print_report(report: &ReconcileReport, json: bool) {
    if json {
        println!(
            "{}",
            json!({
                "migrated": report.migrated,
                "repaired": report.repaired,
                "duplicatesDropped": report.duplicates_dropped,
                "daysRemoved": report.days_removed,
                "reordered": report.reordered,
            })
        );
    } else if report.changed() {
        println!(
            "migrated={} repaired={} duplicates_dropped={} days_removed={}",
            report.migrated, report.repaired, report.duplicates_dropped, report.days_removed
        );
    } else {
        println!("Already up to date");
    }
}
