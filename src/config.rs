//! Migration configuration.
//!
//! The configuration record is a TOML document with four sections:
//! `[source]`, `[target]`, `[migration]`, and `[paths]`. Every migration
//! knob has a documented default; only the connection coordinates are
//! required. CLI flags are merged on top by [`FerryConfig::apply_cli`]
//! with the rules: `--tables` intersects the config include list,
//! `--skip-tables` unions with the config exclude list, and exclude
//! always wins over include.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::FerryError;

/// Source (PostgreSQL) connection coordinates.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub host: String,
    #[serde(default = "default_pg_port")]
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Restrict extraction to one namespace; all user schemas otherwise.
    #[serde(default)]
    pub schema: Option<String>,
}

/// Target (MariaDB/MySQL) connection coordinates.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub host: String,
    #[serde(default = "default_mysql_port")]
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_charset")]
    pub charset: String,
    #[serde(default = "default_collation")]
    pub collation: String,
}

/// Data-phase tuning knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MigrationSettings {
    /// Upper bound on rows fetched per chunk (before memory clamping).
    pub chunk_size: usize,
    /// Pre-clamp chunk cap for tables over the large-table threshold.
    pub large_table_chunk_size: usize,
    /// Tables larger than this (MiB on disk) use the large-table cap.
    pub large_table_threshold_mb: u64,
    /// Worker pool size for the data phase; 1 disables parallelism.
    pub parallel_workers: usize,
    /// Persist a checkpoint every N chunks.
    pub checkpoint_interval: u64,
    /// Skip secondary index creation after the data phase.
    pub skip_indexes: bool,
    /// Process-wide memory envelope the chunk/batch sizing derives from.
    pub memory_budget_mb: u64,
    /// Table whitelist (empty = all).
    pub tables_include: Vec<String>,
    /// Table blacklist; wins over the whitelist.
    pub tables_exclude: Vec<String>,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            chunk_size: 10_000,
            large_table_chunk_size: 50_000,
            large_table_threshold_mb: 1000,
            parallel_workers: 4,
            checkpoint_interval: 100,
            skip_indexes: false,
            memory_budget_mb: 512,
            tables_include: Vec::new(),
            tables_exclude: Vec::new(),
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub checkpoint_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: PathBuf::from("./checkpoints"),
            log_dir: PathBuf::from("./logs"),
        }
    }
}

/// The full configuration record.
#[derive(Debug, Clone, Deserialize)]
pub struct FerryConfig {
    pub source: SourceConfig,
    pub target: TargetConfig,
    #[serde(default)]
    pub migration: MigrationSettings,
    #[serde(default)]
    pub paths: PathsConfig,
}

impl FerryConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, FerryError> {
        let config: FerryConfig =
            toml::from_str(raw).map_err(|e| FerryError::ConfigInvalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file path.
    pub fn load(path: &std::path::Path) -> Result<Self, FerryError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            FerryError::ConfigInvalid(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Reject records no migration could run with. Must pass before any
    /// database work starts.
    pub fn validate(&self) -> Result<(), FerryError> {
        for (field, value) in [
            ("source.host", &self.source.host),
            ("source.database", &self.source.database),
            ("source.user", &self.source.user),
            ("target.host", &self.target.host),
            ("target.database", &self.target.database),
            ("target.user", &self.target.user),
        ] {
            if value.trim().is_empty() {
                return Err(FerryError::ConfigInvalid(format!("{} is empty", field)));
            }
        }
        if self.migration.chunk_size == 0 {
            return Err(FerryError::ConfigInvalid("chunk_size must be > 0".into()));
        }
        if self.migration.parallel_workers == 0 {
            return Err(FerryError::ConfigInvalid(
                "parallel_workers must be > 0".into(),
            ));
        }
        if self.migration.checkpoint_interval == 0 {
            return Err(FerryError::ConfigInvalid(
                "checkpoint_interval must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Merge CLI table filters into the config lists.
    ///
    /// `cli_tables` intersects the include list when both are present
    /// (otherwise whichever is non-empty applies); `cli_skip` unions with
    /// the exclude list. Exclusion is applied after inclusion downstream,
    /// so exclude always wins.
    pub fn merge_table_filters(&mut self, cli_tables: &[String], cli_skip: &[String]) {
        if !cli_tables.is_empty() {
            if self.migration.tables_include.is_empty() {
                self.migration.tables_include = cli_tables.to_vec();
            } else {
                self.migration
                    .tables_include
                    .retain(|t| cli_tables.contains(t));
            }
        }
        for skip in cli_skip {
            if !self.migration.tables_exclude.contains(skip) {
                self.migration.tables_exclude.push(skip.clone());
            }
        }
    }

    /// The memory budget in bytes.
    pub fn memory_budget_bytes(&self) -> u64 {
        self.migration.memory_budget_mb * 1024 * 1024
    }
}

fn default_pg_port() -> u16 {
    5432
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_charset() -> String {
    "utf8mb4".into()
}

fn default_collation() -> String {
    "utf8mb4_unicode_ci".into()
}
