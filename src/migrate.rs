//! Per-table data migration: the fetch → convert → write loop.
//!
//! For each table the migrator counts rows (under the row filter),
//! derives a chunk size from the memory budget, then streams chunks from
//! the source through value conversion into the bulk writer, persisting a
//! checkpoint every `checkpoint_interval` chunks. The checkpoint is
//! removed on completion and kept on failure or cancellation.
//!
//! State machine per table:
//! `Pending → Counting → Streaming → Checkpointed* → Completed`, with
//! `Streaming → Failed` as the single fatal transition.
//!
//! Chunk buffers are dropped before the next fetch, so the process-wide
//! memory envelope follows directly from the chunk/batch sizing below.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use mysql_async::Conn;
use tokio_postgres::Client;
use tracing::{info, warn};

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::config::MigrationSettings;
use crate::convert::{CellValue, convert_cell};
use crate::error::FerryError;
use crate::schema::TableSchema;
use crate::stream::{Cursor, Pagination, RowFilter, count_rows, fetch_chunk};
use crate::writer::write_chunk;

/// Conservative per-row estimate for source fetches.
pub const FETCH_BYTES_PER_ROW: u64 = 4096;
/// Conservative per-row estimate for insert batches.
pub const INSERT_BYTES_PER_ROW: u64 = 2048;

/// Budget below which chunk sizes are additionally capped at 2000 rows.
const SMALL_BUDGET_BYTES: u64 = 150 * 1024 * 1024;

/// Cooperative cancellation flag, set by the signal handler and checked
/// between chunks.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One table queued for the data phase, with its size estimate for
/// smallest-first ordering.
#[derive(Debug, Clone)]
pub struct TableJob {
    pub schema: TableSchema,
    pub size_bytes: i64,
}

/// Row accounting for one completed (or attempted) table.
#[derive(Debug, Clone, Default)]
pub struct MigrationOutcome {
    pub rows_total: i64,
    pub rows_written: u64,
    pub rows_skipped: u64,
    pub convert_warnings: u64,
    pub chunks: u64,
    pub resumed: bool,
}

// ── Memory budgeting ───────────────────────────────────────────────────────

/// Chunk size for a table under the byte budget `m`.
///
/// `clamp(floor(m * 0.2 / 4096), 100, configured_cap)`, where the cap is
/// `large_table_chunk_size` for tables over the large-table threshold and
/// `chunk_size` otherwise. Budgets at or under 150 MiB additionally cap
/// the result at 2000 rows.
pub fn effective_chunk_size(
    m: u64,
    settings: &MigrationSettings,
    table_size_bytes: i64,
) -> usize {
    let large = table_size_bytes as u64 > settings.large_table_threshold_mb * 1024 * 1024;
    let configured_cap = if large {
        settings.large_table_chunk_size
    } else {
        settings.chunk_size
    };

    let derived = ((m as f64 * 0.2) / FETCH_BYTES_PER_ROW as f64).floor() as usize;
    let mut chunk = derived.clamp(100, configured_cap.max(100));
    if m <= SMALL_BUDGET_BYTES {
        chunk = chunk.min(2000);
    }
    chunk
}

/// Batch size for the bulk writer: `clamp(floor(m * 0.3 / 2048), 100, 1000)`.
pub fn effective_batch_size(m: u64) -> usize {
    let derived = ((m as f64 * 0.3) / INSERT_BYTES_PER_ROW as f64).floor() as usize;
    derived.clamp(100, 1000)
}

// ── Offset-mode checkpoint encoding ────────────────────────────────────────

/// In offset mode the checkpoint's cursor slot carries the row offset.
fn offset_to_cursor(offset: u64) -> Cursor {
    Cursor::At(CellValue::BigInt(offset as i64))
}

fn cursor_to_offset(cursor: &Cursor) -> u64 {
    match cursor {
        Cursor::Start => 0,
        Cursor::At(CellValue::BigInt(n)) => (*n).max(0) as u64,
        Cursor::At(CellValue::Int(n)) => (*n).max(0) as u64,
        Cursor::At(_) => 0,
    }
}

// ── Per-table driver ───────────────────────────────────────────────────────

/// Migrate one table's rows. The caller owns FK-check session state on
/// the target connection and must restore it on every exit path.
#[allow(clippy::too_many_arguments)]
pub async fn migrate_table(
    source: &Client,
    target: &mut Conn,
    store: &CheckpointStore,
    settings: &MigrationSettings,
    memory_budget: u64,
    job: &TableJob,
    filter: Option<&RowFilter>,
    resume: bool,
    cancel: &CancelFlag,
) -> Result<MigrationOutcome, FerryError> {
    let schema = &job.schema;
    let table_name = schema.table.to_string();
    let mut outcome = MigrationOutcome::default();

    // Counting
    outcome.rows_total = count_rows(source, schema, filter).await?;
    let chunk_size = effective_chunk_size(memory_budget, settings, job.size_bytes);
    let batch_size = effective_batch_size(memory_budget);
    let pagination = Pagination::for_table(schema);

    // Resume is a per-table decision on checkpoint presence.
    let mut cursor = Cursor::Start;
    let mut offset: u64 = 0;
    if resume {
        if let Some(cp) = store.load(&table_name)? {
            match pagination {
                Pagination::Cursor { .. } => cursor = cp.last_cursor.clone(),
                Pagination::Offset { .. } => offset = cursor_to_offset(&cp.last_cursor),
            }
            outcome.resumed = true;
            info!(
                table = %table_name,
                cursor = ?cp.last_cursor,
                "resuming from checkpoint"
            );
        }
    }

    info!(
        table = %table_name,
        rows = outcome.rows_total,
        chunk_size,
        batch_size,
        mode = match pagination {
            Pagination::Cursor { .. } => "cursor",
            Pagination::Offset { .. } => "offset",
        },
        "streaming table"
    );

    // Streaming
    loop {
        if cancel.is_cancelled() {
            // Keep progress durable so --resume re-executes at most the
            // in-flight chunk.
            save_checkpoint(store, &table_name, &pagination, &cursor, offset, &outcome, chunk_size)?;
            return Err(FerryError::Cancelled);
        }

        let chunk = fetch_chunk(source, schema, &pagination, &cursor, offset, filter, chunk_size)
            .await?;
        if chunk.is_empty() {
            break;
        }
        let fetched = chunk.len();

        let mut rows: Vec<Vec<CellValue>> = Vec::with_capacity(fetched);
        for row in chunk.rows {
            let mut converted = Vec::with_capacity(schema.columns.len());
            for (col, cell) in schema.columns.iter().zip(row) {
                let (value, warning) = convert_cell(col.pg_type, cell);
                if let Some(message) = warning {
                    outcome.convert_warnings += 1;
                    warn!(table = %table_name, column = %col.name, "{}", message);
                }
                converted.push(value);
            }
            rows.push(converted);
        }

        let written = write_chunk(target, schema, rows, batch_size).await?;
        outcome.rows_written += written.written;
        outcome.rows_skipped += written.skipped;
        outcome.chunks += 1;

        if let Some(next) = chunk.next_cursor {
            cursor = next;
        }
        offset += fetched as u64;

        if outcome.chunks % settings.checkpoint_interval == 0 {
            save_checkpoint(store, &table_name, &pagination, &cursor, offset, &outcome, chunk_size)?;
            info!(
                table = %table_name,
                chunks = outcome.chunks,
                rows_done = outcome.rows_written,
                "checkpoint persisted"
            );
        }

        let percent = if outcome.rows_total > 0 {
            (outcome.rows_written as f64 / outcome.rows_total as f64 * 100.0).min(100.0)
        } else {
            100.0
        };
        info!(
            table = %table_name,
            rows_done = outcome.rows_written,
            rows_total = outcome.rows_total,
            percent,
            "progress"
        );

        if fetched < chunk_size {
            break;
        }
    }

    // Completed: the checkpoint only exists while a table is in progress.
    store.remove(&table_name)?;
    info!(
        table = %table_name,
        rows_written = outcome.rows_written,
        rows_skipped = outcome.rows_skipped,
        chunks = outcome.chunks,
        "table complete"
    );
    Ok(outcome)
}

#[allow(clippy::too_many_arguments)]
fn save_checkpoint(
    store: &CheckpointStore,
    table_name: &str,
    pagination: &Pagination,
    cursor: &Cursor,
    offset: u64,
    outcome: &MigrationOutcome,
    chunk_size: usize,
) -> Result<(), FerryError> {
    let position = match pagination {
        Pagination::Cursor { .. } => cursor.clone(),
        Pagination::Offset { .. } => offset_to_cursor(offset),
    };
    store.save(&Checkpoint::new(
        table_name,
        position,
        outcome.rows_total,
        chunk_size,
    ))
}
