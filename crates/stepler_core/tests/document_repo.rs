use rusqlite::Connection;
use serde_json::json;
use stepler_core::db::open_db_in_memory;
use stepler_core::{
    AppDocument, DeletedTask, DocumentPatch, DocumentRepository, HistoryDay,
    JsonFileDocumentRepository, RepoError, SqliteDocumentRepository, Task,
};

fn sample_task(id: &str, completed: bool) -> Task {
    let mut task = Task::new(id, format!("task {id}"));
    task.completed = completed;
    task
}

#[test]
fn sqlite_load_of_empty_store_is_default() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();

    assert_eq!(repo.load(), AppDocument::default());
}

#[test]
fn sqlite_save_merges_fields_over_stored_document() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();

    let history = vec![HistoryDay::new(
        "12 Mar",
        vec![sample_task("1741780800000", true)],
    )];
    repo.save(&DocumentPatch::timeline(
        vec![sample_task("1741953600000", false)],
        history.clone(),
    ))
    .unwrap();
    repo.save(&DocumentPatch::fired_reminders(vec![
        "1741953600000-09:00".to_string(),
    ]))
    .unwrap();
    repo.save(&DocumentPatch::tasks(Vec::new())).unwrap();

    let doc = repo.load();
    assert!(doc.tasks.is_empty());
    assert_eq!(doc.history, history);
    assert_eq!(doc.fired_reminders, vec!["1741953600000-09:00".to_string()]);
    assert!(doc.deleted_tasks.is_empty());
}

#[test]
fn sqlite_empty_patch_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();

    repo.save(&DocumentPatch::default()).unwrap();

    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM app_data;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 0);
}

#[test]
fn sqlite_corrupt_field_resets_only_that_field() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    repo.save(&DocumentPatch::tasks(vec![sample_task("1741953600000", false)]))
        .unwrap();
    conn.execute(
        "INSERT INTO app_data (key, value) VALUES ('history', '{not json');",
        [],
    )
    .unwrap();

    let doc = repo.load();
    assert_eq!(doc.tasks.len(), 1);
    assert!(doc.history.is_empty());
}

#[test]
fn sqlite_task_with_odd_id_does_not_take_siblings_down() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let stored = json!([
        {"id": "1741953600000", "text": "keep me"},
        {"id": 1.5, "text": "fractional id"},
        {"id": null, "text": "null id"},
        "not a task",
        {"id": "1741953600001", "text": ["wrong", "type"]}
    ]);
    conn.execute(
        "INSERT INTO app_data (key, value) VALUES ('tasks', ?1);",
        [stored.to_string()],
    )
    .unwrap();

    let doc = repo.load();
    let texts: Vec<&str> = doc.tasks.iter().map(|task| task.text.as_str()).collect();
    assert_eq!(texts, vec!["keep me", "fractional id", "null id"]);
    assert_eq!(doc.tasks[1].id, "1.5");
    assert_eq!(doc.tasks[2].id, "");
}

#[test]
fn sqlite_unknown_keys_are_kept_as_extra() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO app_data (key, value) VALUES ('currentDate', '\"14 Mar\"');",
        [],
    )
    .unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();

    let doc = repo.load();
    assert_eq!(doc.extra.get("currentDate"), Some(&json!("14 Mar")));
}

#[test]
fn sqlite_round_trips_trash_with_deleted_at() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let deleted = vec![DeletedTask {
        task: sample_task("1741953600000", true),
        deleted_at: 1_741_960_000_000,
    }];

    repo.save(&DocumentPatch {
        deleted_tasks: Some(deleted.clone()),
        ..DocumentPatch::default()
    })
    .unwrap();

    assert_eq!(repo.load().deleted_tasks, deleted);
}

#[test]
fn sqlite_repo_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let err = SqliteDocumentRepository::try_new(&conn)
        .err()
        .expect("unmigrated connection must be rejected");
    match err {
        RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        } => {
            assert_eq!(actual_version, 0);
            assert!(expected_version > 0);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn sqlite_repo_rejects_missing_table() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("DROP TABLE app_data;").unwrap();

    let err = SqliteDocumentRepository::try_new(&conn)
        .err()
        .expect("missing table must be rejected");
    assert!(matches!(err, RepoError::MissingRequiredTable("app_data")));
}

#[test]
fn json_missing_file_loads_default() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonFileDocumentRepository::new(dir.path().join("stepler-data.json"));

    assert_eq!(repo.load(), AppDocument::default());
    assert!(matches!(repo.read_strict(), Err(RepoError::Io(_))));
}

#[test]
fn json_corrupt_file_loads_default_but_strict_read_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stepler-data.json");
    std::fs::write(&path, "{\"tasks\": [").unwrap();
    let repo = JsonFileDocumentRepository::new(&path);

    assert_eq!(repo.load(), AppDocument::default());
    assert!(matches!(repo.read_strict(), Err(RepoError::Json(_))));
}

#[test]
fn json_save_merges_and_keeps_unknown_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stepler-data.json");
    std::fs::write(
        &path,
        json!({
            "tasks": [{"id": 1741953600000u64, "title": "from the http shim", "done": false}],
            "currentDate": "14 Mar",
            "firedReminders": ["x-09:00"]
        })
        .to_string(),
    )
    .unwrap();
    let repo = JsonFileDocumentRepository::new(&path);

    let loaded = repo.load();
    assert_eq!(loaded.tasks[0].id, "1741953600000");
    assert_eq!(loaded.tasks[0].display_text(), "from the http shim");

    repo.save(&DocumentPatch::fired_reminders(Vec::new())).unwrap();

    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(stored["currentDate"], json!("14 Mar"));
    assert_eq!(stored["firedReminders"], json!([]));
    assert_eq!(stored["tasks"][0]["title"], json!("from the http shim"));
}

#[test]
fn json_write_document_creates_parent_dir_and_leaves_no_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("profile");
    let repo = JsonFileDocumentRepository::new(nested.join("stepler-data.json"));
    let doc = AppDocument {
        tasks: vec![sample_task("1741953600000", false)],
        ..AppDocument::default()
    };

    repo.write_document(&doc).unwrap();
    repo.write_document(&doc).unwrap();

    assert_eq!(repo.read_strict().unwrap(), doc);
    let entries: Vec<_> = std::fs::read_dir(&nested).unwrap().collect();
    assert_eq!(entries.len(), 1);
}
