//! Command-line surface.
//!
//! Thin by design: flags are parsed here and folded into the
//! configuration record and a [`RunMode`]; everything else lives in the
//! engine. Date-window flags are validated before any database work
//! (`--date-column` is required as soon as either bound is present).

use clap::Parser;

use crate::error::FerryError;
use crate::stream::RowFilter;

/// Which phases the run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Schema, data, indexes, FKs, validation.
    Full,
    /// DDL only; no rows move.
    SchemaOnly,
    /// Rows only; missing target tables are created first.
    DataOnly,
    /// Only the missing-rows report of the post-validator.
    FindMissing,
}

/// Migrate a PostgreSQL database into MariaDB/MySQL.
#[derive(Debug, Parser)]
#[command(name = "pgferry", version, about)]
pub struct CliArgs {
    /// Path to the TOML configuration record.
    #[arg(long, default_value = "pgferry.toml", env = "PGFERRY_CONFIG")]
    pub config: std::path::PathBuf,

    /// Run all phases (default).
    #[arg(long, conflicts_with_all = ["schema_only", "data_only", "find_missing"])]
    pub full: bool,

    /// Create tables only; move no rows.
    #[arg(long, conflicts_with_all = ["data_only", "find_missing"])]
    pub schema_only: bool,

    /// Move rows only; create just the tables missing on the target.
    #[arg(long, conflicts_with = "find_missing")]
    pub data_only: bool,

    /// Resume interrupted tables from their checkpoints.
    #[arg(long)]
    pub resume: bool,

    /// Plan and log everything; execute nothing against the target.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip secondary index creation.
    #[arg(long)]
    pub skip_indexes: bool,

    /// Comma-separated whitelist, intersected with the config include list.
    #[arg(long, value_delimiter = ',')]
    pub tables: Vec<String>,

    /// Comma-separated blacklist, unioned with the config exclude list.
    #[arg(long, value_delimiter = ',')]
    pub skip_tables: Vec<String>,

    /// Inclusive lower bound, `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`.
    #[arg(long)]
    pub after_date: Option<String>,

    /// Exclusive upper bound, same formats.
    #[arg(long)]
    pub before_date: Option<String>,

    /// Column the date bounds apply to. Required with either bound.
    #[arg(long)]
    pub date_column: Option<String>,

    /// Report rows present on the source but missing on the target.
    #[arg(long)]
    pub find_missing: bool,
}

impl CliArgs {
    pub fn mode(&self) -> RunMode {
        if self.find_missing {
            RunMode::FindMissing
        } else if self.schema_only {
            RunMode::SchemaOnly
        } else if self.data_only {
            RunMode::DataOnly
        } else {
            RunMode::Full
        }
    }

    /// Build the row filter from the date flags, validating consistency.
    pub fn row_filter(&self) -> Result<Option<RowFilter>, FerryError> {
        if self.after_date.is_none() && self.before_date.is_none() {
            if self.date_column.is_some() {
                return Err(FerryError::ConfigInvalid(
                    "--date-column given without --after-date or --before-date".into(),
                ));
            }
            return Ok(None);
        }
        let column = self.date_column.clone().ok_or_else(|| {
            FerryError::ConfigInvalid(
                "--date-column is required when --after-date or --before-date is given".into(),
            )
        })?;
        for bound in [&self.after_date, &self.before_date].into_iter().flatten() {
            validate_date_bound(bound)?;
        }
        Ok(Some(RowFilter {
            column,
            after_inclusive: self.after_date.clone(),
            before_exclusive: self.before_date.clone(),
        }))
    }
}

fn validate_date_bound(bound: &str) -> Result<(), FerryError> {
    let ok = chrono::NaiveDate::parse_from_str(bound, "%Y-%m-%d").is_ok()
        || chrono::NaiveDateTime::parse_from_str(bound, "%Y-%m-%d %H:%M:%S").is_ok();
    if ok {
        Ok(())
    } else {
        Err(FerryError::ConfigInvalid(format!(
            "date bound {:?} is not YYYY-MM-DD or YYYY-MM-DD HH:MM:SS",
            bound
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::parse_from(std::iter::once("pgferry").chain(args.iter().copied()))
    }

    #[test]
    fn test_default_mode_is_full() {
        assert_eq!(parse(&[]).mode(), RunMode::Full);
        assert_eq!(parse(&["--full"]).mode(), RunMode::Full);
    }

    #[test]
    fn test_mode_flags() {
        assert_eq!(parse(&["--schema-only"]).mode(), RunMode::SchemaOnly);
        assert_eq!(parse(&["--data-only"]).mode(), RunMode::DataOnly);
        assert_eq!(parse(&["--find-missing"]).mode(), RunMode::FindMissing);
    }

    #[test]
    fn test_conflicting_modes_rejected() {
        assert!(
            CliArgs::try_parse_from(["pgferry", "--schema-only", "--data-only"]).is_err()
        );
        assert!(CliArgs::try_parse_from(["pgferry", "--full", "--find-missing"]).is_err());
    }

    #[test]
    fn test_table_lists_split_on_commas() {
        let args = parse(&["--tables", "a,b,c", "--skip-tables", "b"]);
        assert_eq!(args.tables, vec!["a", "b", "c"]);
        assert_eq!(args.skip_tables, vec!["b"]);
    }

    #[test]
    fn test_date_filter_requires_column() {
        let args = parse(&["--after-date", "2024-01-01"]);
        assert!(matches!(
            args.row_filter(),
            Err(FerryError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_date_column_requires_a_bound() {
        let args = parse(&["--date-column", "created_at"]);
        assert!(args.row_filter().is_err());
    }

    #[test]
    fn test_valid_date_window() {
        let args = parse(&[
            "--after-date",
            "2024-01-01",
            "--before-date",
            "2024-02-01",
            "--date-column",
            "created_at",
        ]);
        let filter = args.row_filter().unwrap().unwrap();
        assert_eq!(filter.column, "created_at");
        assert_eq!(filter.after_inclusive.as_deref(), Some("2024-01-01"));
        assert_eq!(filter.before_exclusive.as_deref(), Some("2024-02-01"));
    }

    #[test]
    fn test_datetime_bound_accepted() {
        let args = parse(&[
            "--after-date",
            "2024-01-01 12:30:00",
            "--date-column",
            "created_at",
        ]);
        assert!(args.row_filter().unwrap().is_some());
    }

    #[test]
    fn test_garbage_bound_rejected() {
        let args = parse(&["--after-date", "January 1st", "--date-column", "c"]);
        assert!(args.row_filter().is_err());
    }

    #[test]
    fn test_no_filter_when_no_date_flags() {
        assert!(parse(&[]).row_filter().unwrap().is_none());
    }
}
