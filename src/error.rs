//! Error types for pg_ferry.
//!
//! All errors that can occur within the engine are represented by
//! [`FerryError`]. Errors are propagated via `Result<T, FerryError>`
//! throughout the codebase and reported at the CLI boundary, where any
//! uncaught error maps to a nonzero exit code.
//!
//! # Error Classification
//!
//! Errors are classified by how far their blast radius reaches:
//! - **Fatal** — configuration, connection, or schema-read failures.
//!   The run stops.
//! - **Table-local** — failures while streaming or validating one table.
//!   The table is reported as failed and the run moves on.
//! - **Row-local** — a single unconvertible or uninsertable row. The row
//!   is replaced with a sentinel or counted as skipped; never raised on
//!   its own.

use std::fmt;

/// Which end of the migration an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Source,
    Target,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Source => write!(f, "source"),
            Endpoint::Target => write!(f, "target"),
        }
    }
}

/// Primary error type for the migration engine.
#[derive(Debug, thiserror::Error)]
pub enum FerryError {
    // ── Fatal errors — abort before or during setup ──────────────────────
    /// The configuration record is missing a field or is inconsistent
    /// (e.g. a date bound without a date column).
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// A database handle could not be opened.
    #[error("{endpoint} connection failed: {message}")]
    ConnectFailed { endpoint: Endpoint, message: String },

    /// A catalog query against the source failed while extracting a table.
    #[error("schema read failed for {table}: {message}")]
    SchemaRead { table: String, message: String },

    /// A table came back from extraction with zero columns.
    #[error("table {0} has no columns after extraction")]
    EmptySchema(String),

    /// The target rejected an emitted DDL statement.
    #[error("DDL failed for {table}: {message}")]
    DdlApply { table: String, message: String },

    // ── Table-local errors — fail the table, keep the run alive ─────────
    /// A non-catalog query against the source failed.
    #[error("source query failed: {0}")]
    SourceQuery(String),

    /// A non-DDL statement against the target failed.
    #[error("target query failed: {0}")]
    TargetQuery(String),

    /// A multi-row INSERT failed and the per-row fallback collected errors.
    /// Raised at the chunk boundary with the skip count.
    #[error("batch insert failed for {table}: {skipped} rows skipped, first errors: {}", .errors.join("; "))]
    BatchInsert {
        table: String,
        skipped: u64,
        errors: Vec<String>,
    },

    /// A checkpoint file could not be read or written.
    #[error("checkpoint I/O failed at {path}: {message}")]
    CheckpointIo { path: String, message: String },

    // ── Run control ──────────────────────────────────────────────────────
    /// The operator interrupted the run. Session flags have been released
    /// and the last checkpoint is kept for `--resume`.
    #[error("migration cancelled by operator")]
    Cancelled,

    /// An unexpected internal error. Indicates a bug.
    #[error("internal error: {0}")]
    InternalError(String),
}

impl FerryError {
    /// Whether this error stops the whole run.
    ///
    /// Schema-read failures are fatal by policy: a table whose catalog
    /// cannot be read cannot be created on the target, and continuing
    /// would silently drop it from the migration.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FerryError::ConfigInvalid(_)
                | FerryError::ConnectFailed { .. }
                | FerryError::SchemaRead { .. }
                | FerryError::EmptySchema(_)
                | FerryError::DdlApply { .. }
                | FerryError::Cancelled
                | FerryError::InternalError(_)
        )
    }

    /// Whether this error is contained to the table that raised it.
    ///
    /// The data phase prefers completing as many tables as possible and
    /// reporting the remainder.
    pub fn is_table_local(&self) -> bool {
        !self.is_fatal()
    }
}
