//! Store connection bootstrap.
//!
//! # Invariants
//! - Returned connections are fully migrated.
//! - File stores run in WAL mode: `stepler run` and one-shot CLI commands
//!   open the same file concurrently.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a store lives.
#[derive(Debug, Clone, Copy)]
pub enum StoreLocation<'a> {
    File(&'a Path),
    Memory,
}

impl StoreLocation<'_> {
    fn label(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory => "memory",
        }
    }

    fn connect(&self) -> rusqlite::Result<Connection> {
        match self {
            Self::File(path) => Connection::open(path),
            Self::Memory => Connection::open_in_memory(),
        }
    }
}

/// Opens (creating if needed) a store file.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_store(StoreLocation::File(path.as_ref()))
}

/// Opens a throwaway in-memory store.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_store(StoreLocation::Memory)
}

/// Connects, configures and migrates a store. Logs one `db_open` outcome.
pub fn open_store(location: StoreLocation<'_>) -> DbResult<Connection> {
    let started_at = Instant::now();
    let result = location
        .connect()
        .map_err(DbError::from)
        .and_then(|mut conn| prepare(&mut conn, location).map(|()| conn));

    let elapsed_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(_) => info!(
            "event=db_open module=db status=ok mode={} duration_ms={elapsed_ms}",
            location.label()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode={} duration_ms={elapsed_ms} error={err}",
            location.label()
        ),
    }
    result
}

fn prepare(conn: &mut Connection, location: StoreLocation<'_>) -> DbResult<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    if let StoreLocation::File(_) = location {
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        if !mode.eq_ignore_ascii_case("wal") {
            info!("event=db_open module=db status=skip reason=wal_unavailable journal_mode={mode}");
        }
    }
    apply_migrations(conn)?;
    Ok(())
}
