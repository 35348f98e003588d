//! Lending schema history.
//!
//! Each step is a named SQL script. A database records the last step it has
//! seen in `PRAGMA user_version`; opening it replays the missing steps in one
//! transaction, so a failing step leaves the previous schema intact.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// One schema step.
#[derive(Debug, Clone, Copy)]
pub struct SchemaStep {
    pub version: u32,
    pub name: &'static str,
    sql: &'static str,
}

/// Ordered schema history. Versions start at 1 and grow by one.
pub const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "lending",
        sql: include_str!("0001_lending.sql"),
    },
    SchemaStep {
        version: 2,
        name: "request_decisions",
        sql: include_str!("0002_request_decisions.sql"),
    },
];

/// Schema version this build writes.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Schema version recorded in the database.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

/// Brings `conn` up to [`latest_version`] and returns how many steps ran.
///
/// Databases written by a newer build are refused with
/// [`DbError::UnsupportedSchemaVersion`].
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let found = schema_version(conn)?;
    let latest = latest_version();
    if found > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: found,
            latest_supported: latest,
        });
    }

    let missing: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > found)
        .collect();
    if missing.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for step in &missing {
        tx.execute_batch(step.sql)
            .and_then(|()| tx.pragma_update(None, "user_version", step.version))
            .map_err(|source| DbError::Migration {
                version: step.version,
                name: step.name,
                source,
            })?;
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;

    Ok(missing.len())
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, latest_version, schema_version, SCHEMA_STEPS};
    use rusqlite::Connection;

    #[test]
    fn steps_are_contiguous_from_one() {
        for (index, step) in SCHEMA_STEPS.iter().enumerate() {
            assert_eq!(step.version as usize, index + 1, "step {}", step.name);
        }
    }

    #[test]
    fn fresh_database_runs_every_step_once() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(apply_migrations(&mut conn).unwrap(), SCHEMA_STEPS.len());
        assert_eq!(schema_version(&conn).unwrap(), latest_version());
        assert_eq!(apply_migrations(&mut conn).unwrap(), 0);
    }

    #[test]
    fn partially_migrated_database_runs_only_missing_steps() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_STEPS[0].sql).unwrap();
        conn.pragma_update(None, "user_version", 1).unwrap();

        assert_eq!(apply_migrations(&mut conn).unwrap(), SCHEMA_STEPS.len() - 1);
        assert_eq!(schema_version(&conn).unwrap(), latest_version());
    }
}
