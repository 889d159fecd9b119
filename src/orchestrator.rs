//! Phase sequencing for a migration run.
//!
//! Phases: schema → data → indexes → foreign keys → validation. The
//! mode decides which phases run; `--resume` is a per-table decision
//! made inside the data phase from checkpoint presence.
//!
//! The data phase runs a small worker pool across tables (smallest
//! table first). Each worker owns its own source/target connection
//! pair, disables FOREIGN_KEY_CHECKS on its target session for the
//! duration, and restores the flag on every exit path, including
//! cancellation.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use mysql_async::prelude::Queryable;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::checkpoint::CheckpointStore;
use crate::cli::RunMode;
use crate::config::FerryConfig;
use crate::connect::ConnectionRegistry;
use crate::ddl::{emit_add_foreign_key, emit_create_index, emit_create_table};
use crate::error::FerryError;
use crate::migrate::{CancelFlag, TableJob, migrate_table};
use crate::report::{MigrationReport, SkippedFk, SkippedIndex, TableState};
use crate::schema::{TableSchema, estimate_table_size, list_tables, read_table_schema};
use crate::stream::RowFilter;
use crate::validate::{check_foreign_key, find_missing_rows, target_table_exists, validate_table};
use crate::writer::{disable_fk_checks, restore_fk_checks};

/// Options distilled from the CLI for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: RunMode,
    pub resume: bool,
    pub dry_run: bool,
    pub skip_indexes: bool,
    pub filter: Option<RowFilter>,
}

/// Sequences the migration phases.
pub struct Orchestrator {
    config: FerryConfig,
    options: RunOptions,
    registry: Arc<ConnectionRegistry>,
    store: CheckpointStore,
    cancel: CancelFlag,
}

impl Orchestrator {
    pub fn new(config: FerryConfig, options: RunOptions) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(&config));
        let store = CheckpointStore::new(config.paths.checkpoint_dir.clone());
        Self {
            config,
            options,
            registry,
            store,
            cancel: CancelFlag::new(),
        }
    }

    /// Handle for the signal listener.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run the configured phases. Returns the report; fatal setup errors
    /// (config, connect, schema read, DDL) surface as `Err`.
    pub async fn run(&self) -> Result<MigrationReport, FerryError> {
        let started = Instant::now();
        let mut report = MigrationReport::default();

        let source = self.registry.source_client().await?;

        let tables = list_tables(
            &source,
            &self.config.migration.tables_include,
            &self.config.migration.tables_exclude,
            self.config.source.schema.as_deref(),
        )
        .await?;
        if tables.is_empty() {
            warn!("no tables to migrate after include/exclude filtering");
            report.elapsed = started.elapsed();
            return Ok(report);
        }
        info!(count = tables.len(), "tables selected");

        let mut schemas = Vec::with_capacity(tables.len());
        for table in &tables {
            schemas.push(read_table_schema(&source, table).await?);
        }

        match self.options.mode {
            RunMode::FindMissing => {
                self.find_missing_phase(&source, &schemas, &mut report).await?;
            }
            RunMode::SchemaOnly => {
                self.schema_phase(&schemas, false).await?;
            }
            RunMode::DataOnly => {
                // create only what the target is missing; everything else
                // is assumed present and untouched
                self.schema_phase(&schemas, true).await?;
                self.data_phase(&source, &schemas, &mut report).await?;
                if !report.cancelled {
                    self.validation_phase(&source, &schemas, &mut report).await;
                }
            }
            RunMode::Full => {
                self.schema_phase(&schemas, false).await?;
                self.data_phase(&source, &schemas, &mut report).await?;
                if !report.cancelled {
                    self.index_phase(&schemas, &mut report).await;
                    self.fk_phase(&schemas, &mut report).await;
                    self.validation_phase(&source, &schemas, &mut report).await;
                }
            }
        }

        self.registry.dispose().await;
        report.elapsed = started.elapsed();
        report.emit();
        Ok(report)
    }

    // ── Schema phase ───────────────────────────────────────────────────

    async fn schema_phase(
        &self,
        schemas: &[TableSchema],
        only_missing: bool,
    ) -> Result<(), FerryError> {
        if self.options.dry_run {
            for schema in schemas {
                let sql = emit_create_table(schema)?;
                info!(table = %schema.table, "[dry-run] {}", sql);
            }
            return Ok(());
        }

        let mut conn = self.registry.target_conn().await?;
        for schema in schemas {
            let table_name = schema.table.to_string();
            if only_missing && target_table_exists(&mut conn, &schema.table.table_name).await? {
                info!(table = %table_name, "target table present, left untouched");
                continue;
            }
            let sql = emit_create_table(schema)?;
            conn.query_drop(sql)
                .await
                .map_err(|e| FerryError::DdlApply {
                    table: table_name.clone(),
                    message: e.to_string(),
                })?;
            info!(table = %table_name, "table created");
        }
        Ok(())
    }

    // ── Data phase ─────────────────────────────────────────────────────

    async fn data_phase(
        &self,
        source: &tokio_postgres::Client,
        schemas: &[TableSchema],
        report: &mut MigrationReport,
    ) -> Result<(), FerryError> {
        // Smallest first: small tables finish fast and surface schema
        // problems before the multi-hour ones start.
        let mut jobs = Vec::with_capacity(schemas.len());
        for schema in schemas {
            let size_bytes = estimate_table_size(source, &schema.table).await?;
            jobs.push(TableJob {
                schema: schema.clone(),
                size_bytes,
            });
        }
        jobs.sort_by_key(|job| job.size_bytes);

        if self.options.dry_run {
            for job in &jobs {
                info!(
                    table = %job.schema.table,
                    size_bytes = job.size_bytes,
                    "[dry-run] would stream"
                );
            }
            return Ok(());
        }

        self.store.ensure_dir()?;
        let workers = self
            .config
            .migration
            .parallel_workers
            .min(jobs.len())
            .max(1);
        info!(workers, tables = jobs.len(), "data phase starting");

        let queue: Arc<Mutex<VecDeque<TableJob>>> = Arc::new(Mutex::new(jobs.into()));
        let mut set: JoinSet<WorkerResult> = JoinSet::new();
        for worker_id in 0..workers {
            set.spawn(data_worker(
                worker_id,
                Arc::clone(&self.registry),
                self.store.clone(),
                self.config.clone(),
                self.options.filter.clone(),
                self.options.resume,
                self.cancel.clone(),
                Arc::clone(&queue),
            ));
        }

        while let Some(joined) = set.join_next().await {
            let result = joined
                .map_err(|e| FerryError::InternalError(format!("worker panicked: {}", e)))?;
            if result.cancelled {
                report.cancelled = true;
            }
            for table_report in result.reports {
                let name = table_report.table.clone();
                *report.table_mut(&name) = table_report;
            }
        }

        if report.cancelled {
            warn!("data phase cancelled; checkpoints kept for --resume");
        }
        Ok(())
    }

    // ── Index phase ────────────────────────────────────────────────────

    async fn index_phase(&self, schemas: &[TableSchema], report: &mut MigrationReport) {
        if self.options.skip_indexes || self.config.migration.skip_indexes {
            info!("index phase skipped");
            return;
        }
        if self.options.dry_run {
            for schema in schemas {
                for index in &schema.indexes {
                    info!(table = %schema.table, "[dry-run] {}", emit_create_index(schema, index));
                }
            }
            return;
        }
        let mut conn = match self.registry.target_conn().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "index phase skipped: no target connection");
                return;
            }
        };
        for schema in schemas {
            for index in &schema.indexes {
                let sql = emit_create_index(schema, index);
                if let Err(e) = conn.query_drop(sql).await {
                    report.skipped_indexes.push(SkippedIndex {
                        table: schema.table.to_string(),
                        index: index.name.clone(),
                        error: e.to_string(),
                    });
                    warn!(
                        table = %schema.table,
                        index = %index.name,
                        error = %e,
                        "index creation failed, continuing"
                    );
                } else {
                    info!(table = %schema.table, index = %index.name, "index created");
                }
            }
        }
    }

    // ── Foreign-key phase ──────────────────────────────────────────────

    async fn fk_phase(&self, schemas: &[TableSchema], report: &mut MigrationReport) {
        if self.options.dry_run {
            for schema in schemas {
                for fk in &schema.foreign_keys {
                    info!(table = %schema.table, "[dry-run] {}", emit_add_foreign_key(schema, fk));
                }
            }
            return;
        }
        let mut conn = match self.registry.target_conn().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "FK phase skipped: no target connection");
                return;
            }
        };
        for schema in schemas {
            for fk in &schema.foreign_keys {
                match check_foreign_key(&mut conn, schema, fk).await {
                    Ok(None) => {
                        let sql = emit_add_foreign_key(schema, fk);
                        if let Err(e) = conn.query_drop(sql).await {
                            report.skipped_fks.push(SkippedFk {
                                table: schema.table.to_string(),
                                constraint: fk.name.clone(),
                                orphan_count: 0,
                                samples: vec![vec![e.to_string()]],
                            });
                            warn!(
                                table = %schema.table,
                                constraint = %fk.name,
                                error = %e,
                                "ADD CONSTRAINT failed, continuing"
                            );
                        } else {
                            info!(table = %schema.table, constraint = %fk.name, "foreign key added");
                        }
                    }
                    Ok(Some(orphans)) => {
                        warn!(
                            table = %schema.table,
                            constraint = %fk.name,
                            orphans = orphans.orphan_count,
                            samples = ?orphans.samples,
                            "foreign key skipped: orphaned rows on target"
                        );
                        report.skipped_fks.push(SkippedFk {
                            table: schema.table.to_string(),
                            constraint: fk.name.clone(),
                            orphan_count: orphans.orphan_count,
                            samples: orphans.samples,
                        });
                    }
                    Err(e) => {
                        warn!(
                            table = %schema.table,
                            constraint = %fk.name,
                            error = %e,
                            "orphan pre-check failed, FK skipped"
                        );
                        report.skipped_fks.push(SkippedFk {
                            table: schema.table.to_string(),
                            constraint: fk.name.clone(),
                            orphan_count: -1,
                            samples: vec![vec![e.to_string()]],
                        });
                    }
                }
            }
        }
    }

    // ── Validation phase ───────────────────────────────────────────────

    async fn validation_phase(
        &self,
        source: &tokio_postgres::Client,
        schemas: &[TableSchema],
        report: &mut MigrationReport,
    ) {
        if self.options.dry_run {
            return;
        }
        let mut conn = match self.registry.target_conn().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "validation skipped: no target connection");
                return;
            }
        };
        for schema in schemas {
            let name = schema.table.to_string();
            if report.table_mut(&name).state == TableState::Failed {
                continue;
            }
            match validate_table(source, &mut conn, schema).await {
                Ok(verdict) => {
                    if !verdict.passed() {
                        error!(table = %name, verdict = ?verdict, "validation mismatch");
                    } else {
                        info!(table = %name, "validation passed");
                    }
                    report.table_mut(&name).validation = Some(verdict);
                }
                Err(e) => {
                    error!(table = %name, error = %e, "validation errored");
                }
            }
        }
    }

    // ── Missing-row report ─────────────────────────────────────────────

    async fn find_missing_phase(
        &self,
        source: &tokio_postgres::Client,
        schemas: &[TableSchema],
        report: &mut MigrationReport,
    ) -> Result<(), FerryError> {
        let mut conn = self.registry.target_conn().await?;
        for schema in schemas {
            let name = schema.table.to_string();
            let missing = find_missing_rows(source, &mut conn, schema, 100).await?;
            if missing.keys.is_empty() {
                info!(table = %name, "no missing rows");
            } else {
                warn!(
                    table = %name,
                    missing = missing.keys.len(),
                    keys = ?missing.keys,
                    row_probe = missing.used_row_probe,
                    "missing rows on target"
                );
                report.table_mut(&name).error =
                    Some(format!("{} rows missing on target", missing.keys.len()));
            }
        }
        Ok(())
    }
}

/// What one data worker accomplished.
struct WorkerResult {
    reports: Vec<crate::report::TableReport>,
    cancelled: bool,
}

/// One data-phase worker: owns a source/target connection pair and pulls
/// tables off the shared queue until it is drained or the run is
/// cancelled.
#[allow(clippy::too_many_arguments)]
async fn data_worker(
    worker_id: usize,
    registry: Arc<ConnectionRegistry>,
    store: CheckpointStore,
    config: FerryConfig,
    filter: Option<RowFilter>,
    resume: bool,
    cancel: CancelFlag,
    queue: Arc<Mutex<VecDeque<TableJob>>>,
) -> WorkerResult {
    let mut result = WorkerResult {
        reports: Vec::new(),
        cancelled: false,
    };

    let source = match registry.source_client().await {
        Ok(client) => client,
        Err(e) => {
            error!(worker_id, error = %e, "worker could not open source connection");
            return result;
        }
    };
    let mut target = match registry.target_conn().await {
        Ok(conn) => conn,
        Err(e) => {
            error!(worker_id, error = %e, "worker could not open target connection");
            return result;
        }
    };

    if let Err(e) = disable_fk_checks(&mut target).await {
        error!(worker_id, error = %e, "worker could not disable FK checks");
        return result;
    }

    // No early returns below: the FK-checks flag must be restored on this
    // session whatever happens in the loop.
    loop {
        let job = match queue.lock().expect("queue lock").pop_front() {
            Some(job) => job,
            None => break,
        };
        let table_name = job.schema.table.to_string();
        let mut table_report = crate::report::TableReport::new(&table_name);
        table_report.state = TableState::Streaming;

        match migrate_table(
            &source,
            &mut target,
            &store,
            &config.migration,
            config.memory_budget_bytes(),
            &job,
            filter.as_ref(),
            resume,
            &cancel,
        )
        .await
        {
            Ok(outcome) => {
                table_report.state = TableState::Completed;
                table_report.rows_total = outcome.rows_total;
                table_report.rows_written = outcome.rows_written;
                table_report.rows_skipped = outcome.rows_skipped;
                table_report.resumed = outcome.resumed;
            }
            Err(FerryError::Cancelled) => {
                table_report.state = TableState::Checkpointed;
                table_report.error = Some("cancelled; checkpoint kept".into());
                result.cancelled = true;
                result.reports.push(table_report);
                break;
            }
            Err(e) => {
                error!(worker_id, table = %table_name, error = %e, "table failed");
                table_report.state = TableState::Failed;
                table_report.error = Some(e.to_string());
            }
        }
        result.reports.push(table_report);

        if cancel.is_cancelled() {
            result.cancelled = true;
            break;
        }
    }

    restore_fk_checks(&mut target).await;
    result
}
