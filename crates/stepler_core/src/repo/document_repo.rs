//! Document repository contract and SQLite key-value implementation.
//!
//! # Responsibility
//! - Persist each document field (`tasks`, `history`, `deletedTasks`,
//!   `firedReminders`) as one JSON row in `app_data`.
//! - Merge partial writes so concurrent ticks touching different fields do
//!   not clobber each other.
//!
//! # Invariants
//! - A patch is written in a single transaction.
//! - A corrupt row only resets its own field to default on load, and a
//!   corrupt element only drops itself from its list.

use crate::db::migrations::{latest_version, schema_version};
use crate::db::DbError;
use crate::model::document::{AppDocument, DocumentPatch};
use crate::model::task::decode_elements;
use log::{error, info, warn};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for document persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Io(std::io::Error),
    Json(serde_json::Error),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "document i/o failed: {err}"),
            Self::Json(err) => write!(f, "document encoding failed: {err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::UninitializedConnection { .. } | Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<std::io::Error> for RepoError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Whole-document store used by the timeline service.
pub trait DocumentRepository {
    /// Loads the stored document, substituting defaults for anything missing
    /// or unreadable.
    fn load(&self) -> AppDocument;
    /// Merges `patch` over the stored document.
    fn save(&self, patch: &DocumentPatch) -> RepoResult<()>;
}

impl<R: DocumentRepository + ?Sized> DocumentRepository for &R {
    fn load(&self) -> AppDocument {
        (**self).load()
    }

    fn save(&self, patch: &DocumentPatch) -> RepoResult<()> {
        (**self).save(patch)
    }
}

const KEY_TASKS: &str = "tasks";
const KEY_HISTORY: &str = "history";
const KEY_DELETED_TASKS: &str = "deletedTasks";
const KEY_FIRED_REMINDERS: &str = "firedReminders";

/// SQLite-backed key-value document repository.
pub struct SqliteDocumentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentRepository<'conn> {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable` when `app_data` is absent.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn load_rows(&self) -> RepoResult<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM app_data ORDER BY key ASC;")?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push((row.get(0)?, row.get(1)?));
        }
        Ok(entries)
    }
}

impl DocumentRepository for SqliteDocumentRepository<'_> {
    fn load(&self) -> AppDocument {
        let started_at = Instant::now();
        let rows = match self.load_rows() {
            Ok(rows) => rows,
            Err(err) => {
                warn!(
                    "event=doc_load module=repo status=error backend=sqlite error_code=query_failed error={}",
                    err
                );
                return AppDocument::default();
            }
        };

        let mut doc = AppDocument::default();
        for (key, raw) in rows {
            match key.as_str() {
                KEY_TASKS => doc.tasks = decode_list(&key, &raw),
                KEY_HISTORY => doc.history = decode_list(&key, &raw),
                KEY_DELETED_TASKS => doc.deleted_tasks = decode_list(&key, &raw),
                KEY_FIRED_REMINDERS => doc.fired_reminders = decode_field(&key, &raw),
                _ => match serde_json::from_str::<Value>(&raw) {
                    Ok(value) => {
                        doc.extra.insert(key, value);
                    }
                    Err(err) => warn!(
                        "event=doc_load module=repo status=error backend=sqlite field={} error_code=corrupt_field error={}",
                        key, err
                    ),
                },
            }
        }

        info!(
            "event=doc_load module=repo status=ok backend=sqlite tasks={} history_days={} deleted={} duration_ms={}",
            doc.tasks.len(),
            doc.history.len(),
            doc.deleted_tasks.len(),
            started_at.elapsed().as_millis()
        );
        doc
    }

    fn save(&self, patch: &DocumentPatch) -> RepoResult<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if let Some(tasks) = &patch.tasks {
            upsert_field(&tx, KEY_TASKS, tasks)?;
        }
        if let Some(history) = &patch.history {
            upsert_field(&tx, KEY_HISTORY, history)?;
        }
        if let Some(deleted_tasks) = &patch.deleted_tasks {
            upsert_field(&tx, KEY_DELETED_TASKS, deleted_tasks)?;
        }
        if let Some(fired_reminders) = &patch.fired_reminders {
            upsert_field(&tx, KEY_FIRED_REMINDERS, fired_reminders)?;
        }
        if let Err(err) = tx.commit() {
            error!(
                "event=doc_save module=repo status=error backend=sqlite fields={} error={}",
                patch.field_names().join(","),
                err
            );
            return Err(err.into());
        }

        info!(
            "event=doc_save module=repo status=ok backend=sqlite fields={}",
            patch.field_names().join(",")
        );
        Ok(())
    }
}

fn decode_field<T: DeserializeOwned + Default>(key: &str, raw: &str) -> T {
    serde_json::from_str(raw).unwrap_or_else(|err| {
        warn!(
            "event=doc_load module=repo status=error backend=sqlite field={} error_code=corrupt_field error={}",
            key, err
        );
        T::default()
    })
}

fn decode_list<T: DeserializeOwned>(key: &str, raw: &str) -> Vec<T> {
    decode_elements(key, decode_field(key, raw))
}

fn upsert_field<T: Serialize + ?Sized>(tx: &Transaction<'_>, key: &str, value: &T) -> RepoResult<()> {
    let encoded = serde_json::to_string(value)?;
    tx.execute(
        "INSERT INTO app_data (key, value, updated_at)
         VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
         ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at;",
        params![key, encoded],
    )?;
    Ok(())
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'app_data'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::MissingRequiredTable("app_data"));
    }
    Ok(())
}
