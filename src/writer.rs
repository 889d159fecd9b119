//! Bulk writes to the target.
//!
//! A chunk is partitioned into batches; each batch is one multi-row
//! `INSERT … VALUES (…),(…),…` executed as a prepared statement with
//! positional placeholders.
//!
//! # Failure policy
//!
//! A failed batch is retried row by row with a single-row prepared
//! INSERT. Rows whose error mentions `datetime`/`date` are counted as
//! skipped (with a best-effort diagnostic naming the corrupt column);
//! other row errors are collected, capped at ten, and raised as one
//! composite error at the chunk boundary.
//!
//! Foreign-key checks are disabled on the target session for the data
//! phase and re-enabled on every exit path; see
//! [`disable_fk_checks`] / [`restore_fk_checks`].

use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Value};
use tracing::{debug, warn};

use crate::convert::{CellValue, has_corrupt_year};
use crate::dialect::Dialect;
use crate::error::FerryError;
use crate::schema::{ColumnDescriptor, TableSchema};

/// Cap on collected per-row errors before the composite error is raised.
const MAX_COLLECTED_ERRORS: usize = 10;

/// What a chunk write accomplished.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub written: u64,
    pub skipped: u64,
}

/// Build the multi-row INSERT statement for `row_count` rows.
pub fn build_insert_sql(schema: &TableSchema, row_count: usize) -> String {
    let d = Dialect::MySql;
    let placeholders_one = format!(
        "({})",
        vec!["?"; schema.columns.len()].join(", ")
    );
    let placeholders = vec![placeholders_one.as_str(); row_count].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES {}",
        d.qualify(&schema.table.schema_name, &schema.table.table_name),
        d.column_list(&schema.column_names()),
        placeholders
    )
}

/// Lower a converted cell into the driver's value type.
pub fn cell_to_mysql(cell: CellValue) -> Value {
    match cell {
        CellValue::Null => Value::NULL,
        CellValue::Bool(b) => Value::Int(if b { 1 } else { 0 }),
        CellValue::SmallInt(v) => Value::Int(v as i64),
        CellValue::Int(v) => Value::Int(v as i64),
        CellValue::BigInt(v) => Value::Int(v),
        CellValue::Float(v) => Value::Float(v),
        CellValue::Double(v) => Value::Double(v),
        CellValue::Text(s) => Value::Bytes(s.into_bytes()),
        CellValue::Bytes(b) => Value::Bytes(b),
    }
}

/// Write one chunk, sub-partitioned into batches of `batch_size` rows.
pub async fn write_chunk(
    conn: &mut Conn,
    schema: &TableSchema,
    rows: Vec<Vec<CellValue>>,
    batch_size: usize,
) -> Result<WriteOutcome, FerryError> {
    let mut outcome = WriteOutcome::default();
    let mut collected: Vec<String> = Vec::new();

    for batch in rows.chunks(batch_size.max(1)) {
        let sql = build_insert_sql(schema, batch.len());
        let params: Vec<Value> = batch
            .iter()
            .flat_map(|row| row.iter().cloned().map(cell_to_mysql))
            .collect();

        match conn.exec_drop(sql.as_str(), params).await {
            Ok(()) => outcome.written += batch.len() as u64,
            Err(e) => {
                debug!(
                    table = %schema.table,
                    error = %e,
                    rows = batch.len(),
                    "batch insert failed, retrying row by row"
                );
                retry_rows(conn, schema, batch, &mut outcome, &mut collected).await?;
                if collected.len() >= MAX_COLLECTED_ERRORS {
                    return Err(FerryError::BatchInsert {
                        table: schema.table.to_string(),
                        skipped: outcome.skipped,
                        errors: collected,
                    });
                }
            }
        }
    }

    if !collected.is_empty() {
        return Err(FerryError::BatchInsert {
            table: schema.table.to_string(),
            skipped: outcome.skipped,
            errors: collected,
        });
    }
    Ok(outcome)
}

/// Per-row fallback for a failed batch.
async fn retry_rows(
    conn: &mut Conn,
    schema: &TableSchema,
    batch: &[Vec<CellValue>],
    outcome: &mut WriteOutcome,
    collected: &mut Vec<String>,
) -> Result<(), FerryError> {
    let single_sql = build_insert_sql(schema, 1);
    for row in batch {
        let params: Vec<Value> = row.iter().cloned().map(cell_to_mysql).collect();
        match conn.exec_drop(single_sql.as_str(), params).await {
            Ok(()) => outcome.written += 1,
            Err(e) => {
                let message = e.to_string();
                let lowered = message.to_lowercase();
                if lowered.contains("datetime") || lowered.contains("date") {
                    outcome.skipped += 1;
                    warn!(
                        table = %schema.table,
                        column = find_problematic_column(&schema.columns, row).unwrap_or("<unknown>"),
                        error = %message,
                        "row skipped: unparseable date value"
                    );
                } else if collected.len() < MAX_COLLECTED_ERRORS {
                    collected.push(message);
                    if collected.len() >= MAX_COLLECTED_ERRORS {
                        return Ok(());
                    }
                }
            }
        }
    }
    Ok(())
}

/// Scan date-typed columns of a rejected row for the 5+ digit year
/// corruption pattern. Best-effort: names the first match.
pub fn find_problematic_column<'a>(
    columns: &'a [ColumnDescriptor],
    row: &[CellValue],
) -> Option<&'a str> {
    columns
        .iter()
        .zip(row.iter())
        .find(|(col, cell)| {
            col.pg_type.is_datelike()
                && matches!(cell, CellValue::Text(s) if has_corrupt_year(s))
        })
        .map(|(col, _)| col.name.as_str())
}

// ── Target session flags ───────────────────────────────────────────────────

/// Disable foreign-key checks for the data phase.
pub async fn disable_fk_checks(conn: &mut Conn) -> Result<(), FerryError> {
    conn.query_drop("SET FOREIGN_KEY_CHECKS = 0")
        .await
        .map_err(|e| FerryError::TargetQuery(e.to_string()))
}

/// Re-enable foreign-key checks. Must run on every exit path, including
/// cancellation, so it only logs on failure instead of
/// propagating.
pub async fn restore_fk_checks(conn: &mut Conn) {
    if let Err(e) = conn.query_drop("SET FOREIGN_KEY_CHECKS = 1").await {
        warn!(error = %e, "failed to re-enable FOREIGN_KEY_CHECKS on target session");
    }
}
