use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use tracing::{info, warn};

use crate::model::CallRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Committed {
        before: i64,
        after: i64,
        inserted: usize,
    },
    VerificationMismatch {
        before: i64,
        after: i64,
        expected: i64,
    },
}

pub fn open_store(db_path: &Path) -> Result<Connection> {
    let connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(connection)
}

pub(crate) fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS call_data (
              start TEXT NOT NULL,
              duration INTEGER NOT NULL,
              customer TEXT NOT NULL,
              direction TEXT NOT NULL,
              first_routing TEXT NOT NULL,
              first_queue TEXT NOT NULL,
              disposition TEXT NOT NULL,
              wait INTEGER NOT NULL,
              self_service INTEGER NOT NULL,
              active INTEGER NOT NULL,
              on_hold INTEGER NOT NULL,
              contact_id INTEGER NOT NULL,
              source TEXT NOT NULL,
              agent TEXT NOT NULL
            );
            ",
        )
        .context("failed to ensure call_data schema")?;
    Ok(())
}

/// Current row count of `call_data`, or 0 when the table does not exist
/// yet. Only the missing-table condition is tolerated; every other
/// failure propagates.
pub fn table_row_count(connection: &Connection) -> Result<i64> {
    match connection.query_row("SELECT COUNT(1) FROM call_data", [], |row| row.get(0)) {
        Ok(count) => Ok(count),
        Err(err) if is_missing_table(&err) => Ok(0),
        Err(err) => Err(err).context("failed to count rows in call_data"),
    }
}

fn is_missing_table(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(_, Some(message)) if message.starts_with("no such table")
    )
}

pub fn counts_verified(before: i64, inserted: usize, after: i64) -> bool {
    before + inserted as i64 == after
}

/// Appends the records inside one transaction and verifies the row-count
/// delta before committing. A mismatch rolls the whole append back.
pub fn append_records(
    connection: &mut Connection,
    records: &[CallRecord],
) -> Result<AppendOutcome> {
    let before = table_row_count(connection)?;
    info!(
        current_rows = before,
        adding = records.len(),
        "appending to call_data"
    );

    let tx = connection
        .transaction()
        .context("failed to begin transaction")?;
    ensure_schema(&tx)?;

    {
        let mut statement = tx
            .prepare(
                "
                INSERT INTO call_data(
                  start, duration, customer, direction, first_routing, first_queue,
                  disposition, wait, self_service, active, on_hold, contact_id,
                  source, agent
                )
                VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                ",
            )
            .context("failed to prepare call_data insert")?;

        for record in records {
            statement
                .execute(params![
                    record.start,
                    record.duration,
                    record.customer,
                    record.direction,
                    record.first_routing,
                    record.first_queue,
                    record.disposition,
                    record.wait,
                    record.self_service,
                    record.active,
                    record.on_hold,
                    record.contact_id,
                    record.source,
                    record.agent,
                ])
                .context("failed to insert call_data row")?;
        }
    }

    let after = table_row_count(&tx)?;
    if !counts_verified(before, records.len(), after) {
        let expected = before + records.len() as i64;
        warn!(before, after, expected, "row count mismatch, rolling back");
        return Ok(AppendOutcome::VerificationMismatch {
            before,
            after,
            expected,
        });
    }

    tx.commit().context("failed to commit call_data append")?;
    info!(rows = after, "table updated as expected");

    Ok(AppendOutcome::Committed {
        before,
        after,
        inserted: records.len(),
    })
}
