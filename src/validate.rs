//! Constraint validation and post-load verification.
//!
//! Two halves:
//!
//! - **FK validator** — before each `ADD CONSTRAINT … FOREIGN KEY` the
//!   target is checked for orphaned rows (all local columns non-NULL, no
//!   matching referenced tuple). Orphans demote the FK to a warning with
//!   sample tuples; the run never aborts on referential rot.
//! - **Post-validator** — row-count equality per table, then a sampled
//!   content comparison: the first 100 rows of each side are canonically
//!   encoded (keys sorted, NULLs marked), digested with 128-bit xxh3,
//!   and compared as sorted multisets so row order cannot affect the
//!   verdict. When a single-column PK exists the samples are `ORDER BY`
//!   that key on both sides; otherwise both sides order by the first
//!   column, which is the weaker documented guarantee.

use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Value};
use tokio_postgres::Client;
use xxhash_rust::xxh3::xxh3_128;

use crate::convert::CellValue;
use crate::dialect::Dialect;
use crate::error::FerryError;
use crate::schema::{ForeignKeyDescriptor, TableSchema};
use crate::stream::{Cursor, Pagination, fetch_chunk};

/// Rows compared per side by the sampled-content check.
const SAMPLE_ROWS: usize = 100;

/// Orphan sample tuples attached to a skipped-FK warning.
const ORPHAN_SAMPLES: usize = 10;

/// NULL marker inside canonical row encodings; cannot collide with the
/// literal string "NULL".
const NULL_MARK: &str = "\u{0}NULL\u{0}";

/// Field separator inside canonical row encodings.
const FIELD_SEP: char = '\u{1F}';

// ── FK validator ───────────────────────────────────────────────────────────

/// Orphan summary for one foreign key.
#[derive(Debug, Clone)]
pub struct OrphanReport {
    pub orphan_count: i64,
    /// Up to ten offending local-column tuples, rendered as text.
    pub samples: Vec<Vec<String>>,
}

/// Whether a table exists on the target.
pub async fn target_table_exists(conn: &mut Conn, table_name: &str) -> Result<bool, FerryError> {
    let count: Option<(i64,)> = conn
        .exec_first(
            "SELECT COUNT(*) FROM information_schema.TABLES \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?",
            (table_name,),
        )
        .await
        .map_err(|e| FerryError::TargetQuery(e.to_string()))?;
    Ok(count.map(|(n,)| n > 0).unwrap_or(false))
}

/// Orphan-count SQL: rows whose local columns are all non-NULL but have
/// no matching referenced tuple. NULLs are permitted in FKs, so they are
/// excluded from the count.
pub fn build_orphan_count_sql(schema: &TableSchema, fk: &ForeignKeyDescriptor) -> String {
    format!(
        "SELECT COUNT(*) FROM {} c WHERE {}",
        Dialect::MySql.qualify(&schema.table.schema_name, &schema.table.table_name),
        orphan_conditions(fk)
    )
}

/// Sample SQL for the warning: the offending local tuples.
pub fn build_orphan_sample_sql(schema: &TableSchema, fk: &ForeignKeyDescriptor) -> String {
    let d = Dialect::MySql;
    let cols = fk
        .local_columns
        .iter()
        .map(|c| format!("c.{}", d.quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT {} FROM {} c WHERE {} LIMIT {}",
        cols,
        d.qualify(&schema.table.schema_name, &schema.table.table_name),
        orphan_conditions(fk),
        ORPHAN_SAMPLES
    )
}

fn orphan_conditions(fk: &ForeignKeyDescriptor) -> String {
    let d = Dialect::MySql;
    let not_null = fk
        .local_columns
        .iter()
        .map(|c| format!("c.{} IS NOT NULL", d.quote_ident(c)))
        .collect::<Vec<_>>()
        .join(" AND ");
    let join = fk
        .local_columns
        .iter()
        .zip(&fk.referenced_columns)
        .map(|(l, r)| format!("p.{} = c.{}", d.quote_ident(r), d.quote_ident(l)))
        .collect::<Vec<_>>()
        .join(" AND ");
    format!(
        "{} AND NOT EXISTS (SELECT 1 FROM {} p WHERE {})",
        not_null,
        d.quote_ident(&fk.referenced_table),
        join
    )
}

/// Pre-check one FK on the target. `Ok(None)` means the constraint is
/// safe to add; `Ok(Some(report))` means it must be skipped.
pub async fn check_foreign_key(
    conn: &mut Conn,
    schema: &TableSchema,
    fk: &ForeignKeyDescriptor,
) -> Result<Option<OrphanReport>, FerryError> {
    if !target_table_exists(conn, &fk.referenced_table).await? {
        return Ok(Some(OrphanReport {
            orphan_count: -1,
            samples: vec![vec![format!(
                "referenced table {} does not exist",
                fk.referenced_table
            )]],
        }));
    }

    let count: Option<(i64,)> = conn
        .query_first(build_orphan_count_sql(schema, fk))
        .await
        .map_err(|e| FerryError::TargetQuery(e.to_string()))?;
    let orphan_count = count.map(|(n,)| n).unwrap_or(0);
    if orphan_count == 0 {
        return Ok(None);
    }

    let rows: Vec<mysql_async::Row> = conn
        .query(build_orphan_sample_sql(schema, fk))
        .await
        .map_err(|e| FerryError::TargetQuery(e.to_string()))?;
    let samples = rows
        .iter()
        .map(|row| {
            (0..row.len())
                .map(|i| {
                    row.as_ref(i)
                        .and_then(mysql_value_text)
                        .unwrap_or_else(|| "NULL".into())
                })
                .collect()
        })
        .collect();

    Ok(Some(OrphanReport {
        orphan_count,
        samples,
    }))
}

// ── Post-validator ─────────────────────────────────────────────────────────

/// Verdict of the per-table post-load check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationVerdict {
    Passed,
    CountMismatch { source: i64, target: i64 },
    SampleMismatch,
}

impl ValidationVerdict {
    pub fn passed(&self) -> bool {
        matches!(self, ValidationVerdict::Passed)
    }
}

/// Row counts on both sides (source side under no filter: validation
/// compares the loaded table as a whole).
pub async fn count_check(
    source: &Client,
    target: &mut Conn,
    schema: &TableSchema,
) -> Result<(i64, i64), FerryError> {
    let src_sql = format!("SELECT COUNT(*) FROM {}", schema.table.qualified());
    let src: i64 = source
        .query_one(src_sql.as_str(), &[])
        .await
        .map_err(|e| FerryError::SourceQuery(e.to_string()))?
        .get(0);

    let tgt_sql = format!(
        "SELECT COUNT(*) FROM {}",
        Dialect::MySql.qualify(&schema.table.schema_name, &schema.table.table_name)
    );
    let tgt: Option<(i64,)> = target
        .query_first(tgt_sql)
        .await
        .map_err(|e| FerryError::TargetQuery(e.to_string()))?;
    Ok((src, tgt.map(|(n,)| n).unwrap_or(0)))
}

/// Full per-table validation: counts first, samples only when the counts
/// match and are non-zero.
pub async fn validate_table(
    source: &Client,
    target: &mut Conn,
    schema: &TableSchema,
) -> Result<ValidationVerdict, FerryError> {
    let (src_count, tgt_count) = count_check(source, target, schema).await?;
    if src_count != tgt_count {
        return Ok(ValidationVerdict::CountMismatch {
            source: src_count,
            target: tgt_count,
        });
    }
    if src_count == 0 {
        return Ok(ValidationVerdict::Passed);
    }

    let src_hashes = source_sample_hashes(source, schema).await?;
    let tgt_hashes = target_sample_hashes(target, schema).await?;
    if multisets_equal(src_hashes, tgt_hashes) {
        Ok(ValidationVerdict::Passed)
    } else {
        Ok(ValidationVerdict::SampleMismatch)
    }
}

/// Canonical string for one row: `(name, value)` pairs sorted by column
/// name, NULLs marked, fields joined with a unit separator. Numeric text
/// is normalized (trailing fraction zeros trimmed) so the two engines'
/// decimal renderings agree.
pub fn canonical_row(column_names: &[String], values: &[Option<String>]) -> String {
    let mut pairs: Vec<(&str, String)> = column_names
        .iter()
        .zip(values.iter())
        .map(|(name, value)| {
            let rendered = match value {
                Some(v) => normalize_value_text(v),
                None => NULL_MARK.to_string(),
            };
            (name.as_str(), rendered)
        })
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let mut out = String::new();
    for (i, (name, value)) in pairs.iter().enumerate() {
        if i > 0 {
            out.push(FIELD_SEP);
        }
        out.push_str(name);
        out.push('=');
        out.push_str(value);
    }
    out
}

/// 128-bit digest of a canonical row.
pub fn row_digest(canonical: &str) -> u128 {
    xxh3_128(canonical.as_bytes())
}

/// Compare two digest multisets, order-insensitively.
pub fn multisets_equal(mut a: Vec<u128>, mut b: Vec<u128>) -> bool {
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

/// Trim trailing fraction zeros from decimal renderings: `1.5000000000`
/// and `1.50` both canonicalize to `1.5`.
fn normalize_value_text(value: &str) -> String {
    if value.contains('.') && value.parse::<f64>().is_ok() {
        let trimmed = value.trim_end_matches('0').trim_end_matches('.');
        if trimmed.is_empty() || trimmed == "-" {
            return "0".into();
        }
        return trimmed.to_string();
    }
    value.to_string()
}

async fn source_sample_hashes(
    source: &Client,
    schema: &TableSchema,
) -> Result<Vec<u128>, FerryError> {
    let pagination = Pagination::for_table(schema);
    let chunk = fetch_chunk(
        source,
        schema,
        &pagination,
        &Cursor::Start,
        0,
        None,
        SAMPLE_ROWS,
    )
    .await?;
    let names = schema.column_names();
    Ok(chunk
        .rows
        .iter()
        .map(|row| {
            let values: Vec<Option<String>> = row.iter().map(CellValue::render_text).collect();
            row_digest(&canonical_row(&names, &values))
        })
        .collect())
}

/// Target-side SELECT expression for sampling: blobs are hex-encoded to
/// match the source's rendering, everything else is cast to CHAR.
fn target_sample_expr(schema: &TableSchema, name: &str) -> String {
    let d = Dialect::MySql;
    let is_blob = schema
        .column(name)
        .map(|c| c.pg_type == crate::typemap::PgType::Bytea)
        .unwrap_or(false);
    if is_blob {
        format!("LOWER(HEX({}))", d.quote_ident(name))
    } else {
        format!("CAST({} AS CHAR)", d.quote_ident(name))
    }
}

async fn target_sample_hashes(
    target: &mut Conn,
    schema: &TableSchema,
) -> Result<Vec<u128>, FerryError> {
    let d = Dialect::MySql;
    let names = schema.column_names();
    let select_list = names
        .iter()
        .map(|n| target_sample_expr(schema, n))
        .collect::<Vec<_>>()
        .join(", ");
    let order_column = match schema.single_column_pk() {
        Some(pk) => pk.to_string(),
        None => schema.columns[0].name.clone(),
    };
    let sql = format!(
        "SELECT {} FROM {} ORDER BY {} LIMIT {}",
        select_list,
        d.qualify(&schema.table.schema_name, &schema.table.table_name),
        d.quote_ident(&order_column),
        SAMPLE_ROWS
    );

    let rows: Vec<mysql_async::Row> = target
        .query(sql)
        .await
        .map_err(|e| FerryError::TargetQuery(e.to_string()))?;
    Ok(rows
        .iter()
        .map(|row| {
            let values: Vec<Option<String>> = (0..row.len())
                .map(|i| row.as_ref(i).and_then(mysql_value_text))
                .collect();
            row_digest(&canonical_row(&names, &values))
        })
        .collect())
}

/// Render a driver value as text; `None` for NULL.
pub fn mysql_value_text(value: &Value) -> Option<String> {
    match value {
        Value::NULL => None,
        Value::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
        Value::Int(i) => Some(i.to_string()),
        Value::UInt(u) => Some(u.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Double(d) => Some(d.to_string()),
        Value::Date(y, mo, d, 0, 0, 0, 0) => Some(format!("{:04}-{:02}-{:02}", y, mo, d)),
        Value::Date(y, mo, d, h, mi, s, 0) => Some(format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            y, mo, d, h, mi, s
        )),
        Value::Date(y, mo, d, h, mi, s, us) => Some(format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
            y, mo, d, h, mi, s, us
        )),
        Value::Time(neg, days, h, m, s, 0) => {
            let sign = if *neg { "-" } else { "" };
            Some(format!("{}{:02}:{:02}:{:02}", sign, *days * 24 + *h as u32, m, s))
        }
        Value::Time(neg, days, h, m, s, us) => {
            let sign = if *neg { "-" } else { "" };
            Some(format!(
                "{}{:02}:{:02}:{:02}.{:06}",
                sign,
                *days * 24 + *h as u32,
                m,
                s,
                us
            ))
        }
    }
}

// ── Missing-row detection ──────────────────────────────────────────────────

/// Rows present on the source but absent on the target, up to `limit`.
#[derive(Debug, Clone, Default)]
pub struct MissingRows {
    /// PK values (PK path) or row descriptions (probe path), as text.
    pub keys: Vec<String>,
    /// Full source rows for the missing keys, rendered as text tuples.
    pub rows: Vec<Vec<String>>,
    /// Whether the O(N·M) per-row probe had to be used.
    pub used_row_probe: bool,
}

/// Locate up to `limit` source rows missing from the target.
///
/// With a single-column PK this walks source keys in chunks and probes
/// the target with `IN` lists. Without one it falls back to a per-row
/// existence probe using every column as a NULL-safe equality predicate,
/// which is O(N·M) and only acceptable because keyless tables are rare.
pub async fn find_missing_rows(
    source: &Client,
    target: &mut Conn,
    schema: &TableSchema,
    limit: usize,
) -> Result<MissingRows, FerryError> {
    match schema.single_column_pk() {
        Some(pk) => find_missing_by_pk(source, target, schema, pk, limit).await,
        None => find_missing_by_probe(source, target, schema, limit).await,
    }
}

const KEY_SCAN_CHUNK: usize = 1000;

async fn find_missing_by_pk(
    source: &Client,
    target: &mut Conn,
    schema: &TableSchema,
    pk: &str,
    limit: usize,
) -> Result<MissingRows, FerryError> {
    let pg = Dialect::Postgres;
    let my = Dialect::MySql;
    let pk_pg = pg.quote_ident(pk);
    let pk_my = my.quote_ident(pk);
    let target_table = my.qualify(&schema.table.schema_name, &schema.table.table_name);
    let pk_col = schema
        .column(pk)
        .ok_or_else(|| FerryError::InternalError(format!("pk column {} missing", pk)))?;
    let pk_is_text = !pk_col.pg_type.is_integer();

    let mut report = MissingRows::default();
    let mut cursor: Option<String> = None;

    loop {
        // keyset-walk the source PK as text so one code path serves
        // integer and string keys alike
        let mut sql = format!(
            "SELECT {}::text FROM {}",
            pk_pg,
            schema.table.qualified()
        );
        if let Some(last) = &cursor {
            sql.push_str(&format!(" WHERE {}::text > {}", pk_pg, pg.quote_literal(last)));
        }
        sql.push_str(&format!(" ORDER BY {}::text LIMIT {}", pk_pg, KEY_SCAN_CHUNK));

        let rows = source
            .query(sql.as_str(), &[])
            .await
            .map_err(|e| FerryError::SourceQuery(e.to_string()))?;
        if rows.is_empty() {
            break;
        }
        let keys: Vec<String> = rows.iter().map(|r| r.get::<_, String>(0)).collect();
        cursor = keys.last().cloned();

        let in_list = keys
            .iter()
            .map(|k| {
                if pk_is_text {
                    my.quote_literal(k)
                } else {
                    k.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        let probe_sql = format!(
            "SELECT CAST({} AS CHAR) FROM {} WHERE {} IN ({})",
            pk_my, target_table, pk_my, in_list
        );
        let present: Vec<mysql_async::Row> = target
            .query(probe_sql)
            .await
            .map_err(|e| FerryError::TargetQuery(e.to_string()))?;
        let present: std::collections::HashSet<String> = present
            .iter()
            .filter_map(|r| r.as_ref(0).and_then(mysql_value_text))
            .collect();

        for key in keys {
            if !present.contains(&key) {
                report.keys.push(key);
                if report.keys.len() >= limit {
                    break;
                }
            }
        }
        if report.keys.len() >= limit {
            break;
        }
    }

    // fetch the full rows for the missing keys, everything as text
    if !report.keys.is_empty() {
        let in_list = report
            .keys
            .iter()
            .map(|k| pg.quote_literal(k))
            .collect::<Vec<_>>()
            .join(", ");
        let select_list = schema
            .columns
            .iter()
            .map(|c| format!("{}::text", pg.quote_ident(&c.name)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {} FROM {} WHERE {}::text IN ({})",
            select_list,
            schema.table.qualified(),
            pk_pg,
            in_list
        );
        let rows = source
            .query(sql.as_str(), &[])
            .await
            .map_err(|e| FerryError::SourceQuery(e.to_string()))?;
        for row in &rows {
            let rendered = (0..schema.columns.len())
                .map(|idx| {
                    row.try_get::<_, Option<String>>(idx)
                        .ok()
                        .flatten()
                        .unwrap_or_else(|| "NULL".into())
                })
                .collect();
            report.rows.push(rendered);
        }
    }

    Ok(report)
}

async fn find_missing_by_probe(
    source: &Client,
    target: &mut Conn,
    schema: &TableSchema,
    limit: usize,
) -> Result<MissingRows, FerryError> {
    let my = Dialect::MySql;
    let target_table = my.qualify(&schema.table.schema_name, &schema.table.table_name);
    let predicate = schema
        .columns
        .iter()
        .map(|c| format!("{} <=> ?", my.quote_ident(&c.name)))
        .collect::<Vec<_>>()
        .join(" AND ");
    let probe_sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {})",
        target_table, predicate
    );

    let mut report = MissingRows {
        used_row_probe: true,
        ..Default::default()
    };
    let pagination = Pagination::for_table(schema);
    let mut offset: u64 = 0;

    loop {
        let chunk = fetch_chunk(
            source,
            schema,
            &pagination,
            &Cursor::Start,
            offset,
            None,
            KEY_SCAN_CHUNK,
        )
        .await?;
        if chunk.is_empty() {
            break;
        }
        let fetched = chunk.len();

        for row in &chunk.rows {
            let params: Vec<Value> = row
                .iter()
                .cloned()
                .map(crate::writer::cell_to_mysql)
                .collect();
            let exists: Option<(i64,)> = target
                .exec_first(probe_sql.as_str(), params)
                .await
                .map_err(|e| FerryError::TargetQuery(e.to_string()))?;
            if exists.map(|(n,)| n == 0).unwrap_or(true) {
                let rendered: Vec<String> = row
                    .iter()
                    .map(|c| c.render_text().unwrap_or_else(|| "NULL".into()))
                    .collect();
                report.keys.push(rendered.join(", "));
                report.rows.push(rendered);
                if report.keys.len() >= limit {
                    return Ok(report);
                }
            }
        }

        offset += fetched as u64;
        if fetched < KEY_SCAN_CHUNK {
            break;
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDescriptor, ReferentialAction, TableDescriptor};
    use crate::typemap::PgType;

    fn column(name: &str, type_name: &str) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.into(),
            source_type_name: type_name.into(),
            pg_type: PgType::resolve(type_name),
            character_max_length: None,
            numeric_precision: None,
            numeric_scale: None,
            is_nullable: true,
            default_expr: None,
            ordinal: 0,
        }
    }

    fn orders_schema() -> TableSchema {
        TableSchema {
            table: TableDescriptor::new("public", "orders"),
            columns: vec![column("id", "integer"), column("user_id", "integer")],
            primary_key: Some(vec!["id".into()]),
            indexes: vec![],
            foreign_keys: vec![],
        }
    }

    fn fk() -> ForeignKeyDescriptor {
        ForeignKeyDescriptor {
            name: "fk_orders_user".into(),
            local_columns: vec!["user_id".into()],
            referenced_table: "users".into(),
            referenced_columns: vec!["id".into()],
            on_update: ReferentialAction::NoAction,
            on_delete: ReferentialAction::NoAction,
        }
    }

    #[test]
    fn test_orphan_count_sql() {
        let sql = build_orphan_count_sql(&orders_schema(), &fk());
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM `orders` c WHERE c.`user_id` IS NOT NULL AND \
             NOT EXISTS (SELECT 1 FROM `users` p WHERE p.`id` = c.`user_id`)"
        );
    }

    #[test]
    fn test_orphan_sample_sql_limits_to_ten() {
        let sql = build_orphan_sample_sql(&orders_schema(), &fk());
        assert!(sql.starts_with("SELECT c.`user_id` FROM `orders` c"));
        assert!(sql.ends_with("LIMIT 10"));
    }

    #[test]
    fn test_composite_fk_conditions() {
        let mut composite = fk();
        composite.local_columns = vec!["a".into(), "b".into()];
        composite.referenced_columns = vec!["x".into(), "y".into()];
        let cond = orphan_conditions(&composite);
        assert!(cond.contains("c.`a` IS NOT NULL AND c.`b` IS NOT NULL"));
        assert!(cond.contains("p.`x` = c.`a` AND p.`y` = c.`b`"));
    }

    // ── Canonical encoding ─────────────────────────────────────────────

    #[test]
    fn test_canonical_row_sorts_keys() {
        let a = canonical_row(
            &["b".into(), "a".into()],
            &[Some("2".into()), Some("1".into())],
        );
        let b = canonical_row(
            &["a".into(), "b".into()],
            &[Some("1".into()), Some("2".into())],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_canonical_row_null_differs_from_literal() {
        let null_row = canonical_row(&["a".into()], &[None]);
        let text_row = canonical_row(&["a".into()], &[Some("NULL".into())]);
        assert_ne!(null_row, text_row);
    }

    #[test]
    fn test_decimal_renderings_agree() {
        // PG renders NUMERIC as inserted; the target pads DECIMAL(20,10)
        let pg_side = canonical_row(&["amount".into()], &[Some("1.50".into())]);
        let my_side = canonical_row(&["amount".into()], &[Some("1.5000000000".into())]);
        assert_eq!(pg_side, my_side);
    }

    #[test]
    fn test_integer_text_untouched() {
        assert_eq!(normalize_value_text("100"), "100");
        assert_eq!(normalize_value_text("2024-01-02"), "2024-01-02");
        // version-ish strings are not numeric
        assert_eq!(normalize_value_text("1.2.3"), "1.2.3");
    }

    #[test]
    fn test_sample_verdict_is_order_invariant() {
        let rows = ["r1", "r2", "r3"];
        let forward: Vec<u128> = rows.iter().map(|r| row_digest(r)).collect();
        let backward: Vec<u128> = rows.iter().rev().map(|r| row_digest(r)).collect();
        assert!(multisets_equal(forward.clone(), backward));

        let different: Vec<u128> = ["r1", "r2", "r4"].iter().map(|r| row_digest(r)).collect();
        assert!(!multisets_equal(forward, different));
    }

    #[test]
    fn test_multiset_compare_respects_duplicates() {
        let a = vec![row_digest("x"), row_digest("x"), row_digest("y")];
        let b = vec![row_digest("x"), row_digest("y"), row_digest("y")];
        assert!(!multisets_equal(a, b));
    }

    #[test]
    fn test_mysql_value_rendering() {
        assert_eq!(mysql_value_text(&Value::NULL), None);
        assert_eq!(mysql_value_text(&Value::Int(-5)), Some("-5".into()));
        assert_eq!(
            mysql_value_text(&Value::Bytes(b"abc".to_vec())),
            Some("abc".into())
        );
        assert_eq!(
            mysql_value_text(&Value::Date(2024, 1, 2, 0, 0, 0, 0)),
            Some("2024-01-02".into())
        );
        assert_eq!(
            mysql_value_text(&Value::Date(2024, 1, 2, 10, 0, 0, 0)),
            Some("2024-01-02 10:00:00".into())
        );
        assert_eq!(
            mysql_value_text(&Value::Time(false, 0, 10, 30, 0, 0)),
            Some("10:30:00".into())
        );
    }

    #[test]
    fn test_verdict_helpers() {
        assert!(ValidationVerdict::Passed.passed());
        assert!(
            !ValidationVerdict::CountMismatch {
                source: 3,
                target: 2
            }
            .passed()
        );
        assert!(!ValidationVerdict::SampleMismatch.passed());
    }
}
