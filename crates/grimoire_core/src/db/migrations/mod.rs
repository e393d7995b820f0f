//! Embedded schema migrations.
//!
//! Each step is a SQL script applied once, in version order. The highest
//! applied version lives in `PRAGMA user_version`; a database stamped with a
//! version newer than this binary knows is refused.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, TransactionBehavior};

struct Step {
    version: u32,
    script: &'static str,
}

const STEPS: &[Step] = &[Step {
    version: 1,
    script: include_str!("0001_init.sql"),
}];

/// Highest schema version this binary can create.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |step| step.version)
}

/// Reads the schema version stamped on `conn`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Brings `conn` up to `latest_version()`.
///
/// Runs inside one IMMEDIATE transaction so concurrent first starts on a
/// fresh file serialize on the write lock; the loser re-reads the version.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    if ensure_supported(schema_version(conn)?)? == latest_version() {
        return Ok(());
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let from = ensure_supported(schema_version(&tx)?)?;
    for step in pending(from) {
        tx.execute_batch(step.script)?;
        tx.pragma_update(None, "user_version", step.version)?;
        info!(
            "event=db_migrate module=db status=ok from={} to={}",
            from, step.version
        );
    }
    tx.commit()?;
    Ok(())
}

fn ensure_supported(version: u32) -> DbResult<u32> {
    let latest = latest_version();
    if version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: version,
            latest_supported: latest,
        });
    }
    Ok(version)
}

fn pending(applied: u32) -> impl Iterator<Item = &'static Step> {
    STEPS.iter().filter(move |step| step.version > applied)
}
