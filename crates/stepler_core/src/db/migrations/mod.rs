//! Schema steps for the key-value store.
//!
//! # Invariants
//! - Step `n` (1-based) moves the store to schema version `n`.
//! - The reached version is mirrored to `PRAGMA user_version` inside the
//!   same transaction as the step itself.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

const STEPS: &[&str] = &[include_str!("0001_init.sql")];

/// Version range covered by one [`apply_migrations`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub from: u32,
    pub to: u32,
}

impl MigrationOutcome {
    pub fn applied(&self) -> bool {
        self.from != self.to
    }
}

/// Schema version this build writes.
pub fn latest_version() -> u32 {
    STEPS.len() as u32
}

/// Reads `PRAGMA user_version`.
pub fn schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}

/// Brings `conn` up to [`latest_version`].
///
/// # Errors
/// - `SchemaTooNew` when the store was written by a newer build.
/// - `Sqlite` when a step fails; the store keeps its previous version.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<MigrationOutcome> {
    let outcome = MigrationOutcome {
        from: schema_version(conn)?,
        to: latest_version(),
    };
    if outcome.from > outcome.to {
        return Err(DbError::SchemaTooNew {
            found: outcome.from,
            supported: outcome.to,
        });
    }
    if !outcome.applied() {
        return Ok(outcome);
    }

    let tx = conn.transaction()?;
    for (version, sql) in (1u32..).zip(STEPS).skip(outcome.from as usize) {
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        outcome.from, outcome.to
    );
    Ok(outcome)
}
