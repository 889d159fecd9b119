//! Final run report: per-table outcomes, skipped constraints, totals.
//!
//! The report is accumulated by the orchestrator as phases complete and
//! emitted once at the end of the run. It is also the return value of
//! [`crate::orchestrator::Orchestrator::run`], so tests can assert on it
//! directly.

use std::time::Duration;

use tracing::{info, warn};

use crate::validate::ValidationVerdict;

/// Data-phase state of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    Pending,
    Counting,
    Streaming,
    Checkpointed,
    Completed,
    Failed,
}

impl TableState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableState::Pending => "PENDING",
            TableState::Counting => "COUNTING",
            TableState::Streaming => "STREAMING",
            TableState::Checkpointed => "CHECKPOINTED",
            TableState::Completed => "COMPLETED",
            TableState::Failed => "FAILED",
        }
    }
}

/// Outcome of one table across all phases.
#[derive(Debug, Clone)]
pub struct TableReport {
    pub table: String,
    pub state: TableState,
    pub rows_total: i64,
    pub rows_written: u64,
    pub rows_skipped: u64,
    pub resumed: bool,
    pub validation: Option<ValidationVerdict>,
    pub error: Option<String>,
}

impl TableReport {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            state: TableState::Pending,
            rows_total: 0,
            rows_written: 0,
            rows_skipped: 0,
            resumed: false,
            validation: None,
            error: None,
        }
    }
}

/// A foreign key demoted to a warning by the orphan pre-check.
#[derive(Debug, Clone)]
pub struct SkippedFk {
    pub table: String,
    pub constraint: String,
    pub orphan_count: i64,
    pub samples: Vec<Vec<String>>,
}

/// An index whose creation failed (logged, never fatal).
#[derive(Debug, Clone)]
pub struct SkippedIndex {
    pub table: String,
    pub index: String,
    pub error: String,
}

/// The whole run.
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    pub tables: Vec<TableReport>,
    pub skipped_fks: Vec<SkippedFk>,
    pub skipped_indexes: Vec<SkippedIndex>,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl MigrationReport {
    pub fn table_mut(&mut self, name: &str) -> &mut TableReport {
        if let Some(idx) = self.tables.iter().position(|t| t.table == name) {
            return &mut self.tables[idx];
        }
        self.tables.push(TableReport::new(name));
        self.tables.last_mut().expect("just pushed")
    }

    pub fn completed_count(&self) -> usize {
        self.tables
            .iter()
            .filter(|t| t.state == TableState::Completed)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.tables
            .iter()
            .filter(|t| t.state == TableState::Failed)
            .count()
    }

    /// Whether the run as a whole succeeded: nothing failed, nothing was
    /// cancelled. Skipped FKs and indexes are warnings, not failures.
    pub fn succeeded(&self) -> bool {
        !self.cancelled && self.failed_count() == 0
    }

    /// Emit the final summary to the log sink.
    pub fn emit(&self) {
        let total_rows: u64 = self.tables.iter().map(|t| t.rows_written).sum();
        let total_skipped: u64 = self.tables.iter().map(|t| t.rows_skipped).sum();
        info!(
            tables_completed = self.completed_count(),
            tables_failed = self.failed_count(),
            rows_written = total_rows,
            rows_skipped = total_skipped,
            elapsed_secs = self.elapsed.as_secs(),
            "migration finished"
        );

        for table in &self.tables {
            match (&table.state, &table.validation) {
                (TableState::Failed, _) => warn!(
                    table = %table.table,
                    error = table.error.as_deref().unwrap_or("unknown"),
                    "table failed"
                ),
                (_, Some(verdict)) if !verdict.passed() => warn!(
                    table = %table.table,
                    verdict = ?verdict,
                    "validation mismatch"
                ),
                _ => {}
            }
        }
        for fk in &self.skipped_fks {
            warn!(
                table = %fk.table,
                constraint = %fk.constraint,
                orphans = fk.orphan_count,
                samples = ?fk.samples,
                "foreign key skipped"
            );
        }
        for idx in &self.skipped_indexes {
            warn!(
                table = %idx.table,
                index = %idx.index,
                error = %idx.error,
                "index creation failed"
            );
        }
    }
}
